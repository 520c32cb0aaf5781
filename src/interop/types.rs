//! Foreign Value Model
//!
//! Defines the tagged representation of values crossing the language
//! boundary, plus the accessor traits the embedding runtime implements.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::error::{ArgumentError, ForeignError};

/// Variant tag of a foreign value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantTag {
    Null,
    Primitive,
    Executable,
    Array,
    Object,
    Pointer,
}

impl VariantTag {
    /// Lower-case name used in messages and CLI output
    pub fn as_str(&self) -> &'static str {
        match self {
            VariantTag::Null => "null",
            VariantTag::Primitive => "primitive",
            VariantTag::Executable => "executable",
            VariantTag::Array => "array",
            VariantTag::Object => "object",
            VariantTag::Pointer => "pointer",
        }
    }
}

impl fmt::Display for VariantTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar payload of a `Primitive` value
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Bool(b) => write!(f, "{}", b),
            Primitive::Int(i) => write!(f, "{}", i),
            Primitive::Float(v) => write!(f, "{}", v),
            Primitive::String(s) => write!(f, "{:?}", s),
        }
    }
}

/// Number of arguments a callable accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly `n` arguments
    Exact(usize),
    /// `n` or more arguments (variadic)
    AtLeast(usize),
    /// The runtime does not report an arity
    Unknown,
}

impl Arity {
    /// Check an argument count against this arity
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
            Arity::Unknown => true,
        }
    }

    /// The reported parameter count, if any
    pub fn expected(&self) -> Option<usize> {
        match *self {
            Arity::Exact(n) | Arity::AtLeast(n) => Some(n),
            Arity::Unknown => None,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{}", n),
            Arity::AtLeast(n) => write!(f, "{}+", n),
            Arity::Unknown => write!(f, "?"),
        }
    }
}

/// Invocation entry point of the embedding runtime.
///
/// Implementations may block for as long as the foreign code runs and may
/// call back into the bridge.
pub trait ForeignCallable: Send + Sync {
    /// Transfer control to the foreign callable
    fn call(&self, args: &[ForeignValue]) -> Result<ForeignValue, ForeignError>;

    /// Validate arguments before control is transferred. Runs after the
    /// arity check; a rejection never reaches foreign code.
    fn check_args(&self, _args: &[ForeignValue]) -> Result<(), ArgumentError> {
        Ok(())
    }

    /// Human-readable description for diagnostics
    fn describe(&self) -> String {
        "<foreign callable>".to_string()
    }
}

impl<F> ForeignCallable for F
where
    F: Fn(&[ForeignValue]) -> Result<ForeignValue, ForeignError> + Send + Sync,
{
    fn call(&self, args: &[ForeignValue]) -> Result<ForeignValue, ForeignError> {
        self(args)
    }
}

/// Element access into a foreign array
pub trait ArrayAccessor: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Option<ForeignValue>;

    /// Whether the foreign side allows writes to this array
    fn is_mutable(&self) -> bool;
}

/// Member access into a foreign object
pub trait MemberAccessor: Send + Sync {
    fn keys(&self) -> Vec<String>;

    fn get(&self, key: &str) -> Option<ForeignValue>;

    /// Whether the foreign side allows writes to this object
    fn is_mutable(&self) -> bool;
}

/// Shared reference to a foreign callable plus its arity hint
#[derive(Clone)]
pub struct ExecutableRef {
    callable: Arc<dyn ForeignCallable>,
    arity: Arity,
}

impl ExecutableRef {
    pub fn new(callable: Arc<dyn ForeignCallable>, arity: Arity) -> Self {
        Self { callable, arity }
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn callable(&self) -> &Arc<dyn ForeignCallable> {
        &self.callable
    }

    fn identity(&self) -> usize {
        Arc::as_ptr(&self.callable) as *const () as usize
    }
}

impl fmt::Debug for ExecutableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutableRef")
            .field("callable", &self.callable.describe())
            .field("arity", &self.arity)
            .finish()
    }
}

/// Shared reference to a foreign array
#[derive(Clone)]
pub struct ArrayRef {
    accessor: Arc<dyn ArrayAccessor>,
}

impl ArrayRef {
    pub fn new(accessor: Arc<dyn ArrayAccessor>) -> Self {
        Self { accessor }
    }

    pub fn accessor(&self) -> &dyn ArrayAccessor {
        self.accessor.as_ref()
    }

    fn identity(&self) -> usize {
        Arc::as_ptr(&self.accessor) as *const () as usize
    }
}

impl fmt::Debug for ArrayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayRef")
            .field("len", &self.accessor.len())
            .field("mutable", &self.accessor.is_mutable())
            .finish()
    }
}

/// Shared reference to a foreign object
#[derive(Clone)]
pub struct ObjectRef {
    accessor: Arc<dyn MemberAccessor>,
}

impl ObjectRef {
    pub fn new(accessor: Arc<dyn MemberAccessor>) -> Self {
        Self { accessor }
    }

    pub fn accessor(&self) -> &dyn MemberAccessor {
        self.accessor.as_ref()
    }

    fn identity(&self) -> usize {
        Arc::as_ptr(&self.accessor) as *const () as usize
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef")
            .field("keys", &self.accessor.keys())
            .field("mutable", &self.accessor.is_mutable())
            .finish()
    }
}

/// Raw foreign address. The bridge never dereferences or frees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(pub usize);

impl RawHandle {
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

/// A value that crosses the language boundary
#[derive(Debug, Clone)]
pub enum ForeignValue {
    Null,
    Primitive(Primitive),
    Executable(ExecutableRef),
    Array(ArrayRef),
    Object(ObjectRef),
    Pointer(RawHandle),
}

impl ForeignValue {
    /// Wrap a host closure with the given arity hint
    pub fn executable<F>(arity: Arity, callable: F) -> Self
    where
        F: Fn(&[ForeignValue]) -> Result<ForeignValue, ForeignError> + Send + Sync + 'static,
    {
        ForeignValue::Executable(ExecutableRef::new(Arc::new(callable), arity))
    }

    /// Wrap a runtime-provided callable
    pub fn callable(callable: Arc<dyn ForeignCallable>, arity: Arity) -> Self {
        ForeignValue::Executable(ExecutableRef::new(callable, arity))
    }

    /// Wrap a shared array accessor
    pub fn array(accessor: Arc<dyn ArrayAccessor>) -> Self {
        ForeignValue::Array(ArrayRef::new(accessor))
    }

    /// Wrap a shared member accessor
    pub fn object(accessor: Arc<dyn MemberAccessor>) -> Self {
        ForeignValue::Object(ObjectRef::new(accessor))
    }

    pub fn pointer(address: usize) -> Self {
        ForeignValue::Pointer(RawHandle(address))
    }

    /// Get the variant tag of this value
    pub fn tag(&self) -> VariantTag {
        match self {
            ForeignValue::Null => VariantTag::Null,
            ForeignValue::Primitive(_) => VariantTag::Primitive,
            ForeignValue::Executable(_) => VariantTag::Executable,
            ForeignValue::Array(_) => VariantTag::Array,
            ForeignValue::Object(_) => VariantTag::Object,
            ForeignValue::Pointer(_) => VariantTag::Pointer,
        }
    }

    pub fn as_primitive(&self) -> Option<&Primitive> {
        match self {
            ForeignValue::Primitive(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ForeignValue::Primitive(Primitive::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ForeignValue::Primitive(Primitive::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Whether two values refer to the same foreign object.
    ///
    /// Reference variants compare by shared-pointer identity, pointers by
    /// address, primitives by value.
    pub fn same_object(&self, other: &ForeignValue) -> bool {
        match (self, other) {
            (ForeignValue::Null, ForeignValue::Null) => true,
            (ForeignValue::Primitive(a), ForeignValue::Primitive(b)) => a == b,
            (ForeignValue::Executable(a), ForeignValue::Executable(b)) => {
                a.identity() == b.identity()
            }
            (ForeignValue::Array(a), ForeignValue::Array(b)) => a.identity() == b.identity(),
            (ForeignValue::Object(a), ForeignValue::Object(b)) => a.identity() == b.identity(),
            (ForeignValue::Pointer(a), ForeignValue::Pointer(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for ForeignValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForeignValue::Null => write!(f, "null"),
            ForeignValue::Primitive(p) => write!(f, "{}", p),
            ForeignValue::Executable(e) => {
                write!(f, "<executable {} arity={}>", e.callable.describe(), e.arity)
            }
            ForeignValue::Array(a) => write!(f, "<array len={}>", a.accessor.len()),
            ForeignValue::Object(o) => write!(f, "<object keys={}>", o.accessor.keys().len()),
            ForeignValue::Pointer(p) => write!(f, "0x{:x}", p.0),
        }
    }
}

impl From<bool> for ForeignValue {
    fn from(v: bool) -> Self {
        ForeignValue::Primitive(Primitive::Bool(v))
    }
}

impl From<i64> for ForeignValue {
    fn from(v: i64) -> Self {
        ForeignValue::Primitive(Primitive::Int(v))
    }
}

impl From<f64> for ForeignValue {
    fn from(v: f64) -> Self {
        ForeignValue::Primitive(Primitive::Float(v))
    }
}

impl From<&str> for ForeignValue {
    fn from(v: &str) -> Self {
        ForeignValue::Primitive(Primitive::String(v.to_string()))
    }
}

impl From<String> for ForeignValue {
    fn from(v: String) -> Self {
        ForeignValue::Primitive(Primitive::String(v))
    }
}

// =============================================================================
// Host-side containers
// =============================================================================

/// Runtime-owned array. The runtime mutates it through `set`/`push`; the
/// bridge only reads through `ArrayAccessor`.
pub struct HostArray {
    elements: RwLock<Vec<ForeignValue>>,
    mutable: bool,
}

impl HostArray {
    pub fn new(elements: Vec<ForeignValue>, mutable: bool) -> Self {
        Self {
            elements: RwLock::new(elements),
            mutable,
        }
    }

    /// Replace an element (foreign side). Returns false when out of range.
    pub fn set(&self, index: usize, value: ForeignValue) -> bool {
        let mut elements = self.elements.write();
        match elements.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Append an element (foreign side)
    pub fn push(&self, value: ForeignValue) {
        self.elements.write().push(value);
    }
}

impl ArrayAccessor for HostArray {
    fn len(&self) -> usize {
        self.elements.read().len()
    }

    fn get(&self, index: usize) -> Option<ForeignValue> {
        self.elements.read().get(index).cloned()
    }

    fn is_mutable(&self) -> bool {
        self.mutable
    }
}

/// Runtime-owned object with string keys
pub struct HostObject {
    members: RwLock<BTreeMap<String, ForeignValue>>,
    mutable: bool,
}

impl HostObject {
    pub fn new(members: BTreeMap<String, ForeignValue>, mutable: bool) -> Self {
        Self {
            members: RwLock::new(members),
            mutable,
        }
    }

    /// Insert or replace a member (foreign side)
    pub fn insert(&self, key: impl Into<String>, value: ForeignValue) -> Option<ForeignValue> {
        self.members.write().insert(key.into(), value)
    }
}

impl MemberAccessor for HostObject {
    fn keys(&self) -> Vec<String> {
        self.members.read().keys().cloned().collect()
    }

    fn get(&self, key: &str) -> Option<ForeignValue> {
        self.members.read().get(key).cloned()
    }

    fn is_mutable(&self) -> bool {
        self.mutable
    }
}
