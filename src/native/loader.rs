//! Dynamic Library Loader
//!
//! Safe wrapper around libloading. Symbols resolved from a loaded library
//! become `NativeFunction`s, which the bridge invokes like any other
//! foreign callable.

use std::collections::HashMap;
use std::ffi::CString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::{Library, Symbol};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use thiserror::Error;

use super::signature::{NativeSignature, NativeType};
use crate::interop::{ArgumentError, ForeignCallable, ForeignError, ForeignValue, Primitive};

/// Maximum number of machine-word arguments a native call may take
pub const MAX_NATIVE_ARGS: usize = 6;

static DEFAULT_SEARCH_PATHS: Lazy<Vec<PathBuf>> = Lazy::new(default_search_paths);

/// Error type for dynamic library operations
#[derive(Debug, Clone, Error)]
pub enum NativeError {
    #[error("Load error: {0}")]
    LoadError(String),

    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Library not loaded: {0}")]
    LibraryNotLoaded(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Too many parameters: {0} (max {})", MAX_NATIVE_ARGS)]
    TooManyParams(usize),
}

/// A dynamically loaded library
pub struct NativeLibrary {
    /// Path or name the library was loaded from
    path: PathBuf,
    /// The loaded library handle
    library: Library,
    /// Cached symbol addresses
    symbols: Mutex<HashMap<String, usize>>,
}

impl NativeLibrary {
    /// Load a library from the given path or system name
    pub fn load(path: impl AsRef<Path>) -> Result<Self, NativeError> {
        let path = path.as_ref().to_path_buf();

        // Safety: loading a library runs its initialisers. The caller
        // vouches for the library it names in the configuration.
        let library = unsafe {
            Library::new(&path).map_err(|e| {
                NativeError::LoadError(format!(
                    "Failed to load library '{}': {}",
                    path.display(),
                    e
                ))
            })?
        };

        Ok(Self {
            path,
            library,
            symbols: Mutex::new(HashMap::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get a symbol address by name
    pub fn symbol(&self, name: &str) -> Result<usize, NativeError> {
        if let Some(&addr) = self.symbols.lock().get(name) {
            return Ok(addr);
        }

        let c_name = CString::new(name)
            .map_err(|_| NativeError::InvalidSymbol(format!("Invalid symbol name: {}", name)))?;

        // Safety: the address is only called through a NativeSignature the
        // embedder declared for it.
        let symbol: Symbol<*const ()> = unsafe {
            self.library.get(c_name.as_bytes_with_nul()).map_err(|e| {
                NativeError::SymbolNotFound(format!(
                    "Symbol '{}' not found in '{}': {}",
                    name,
                    self.path.display(),
                    e
                ))
            })?
        };

        let addr = *symbol as usize;
        self.symbols.lock().insert(name.to_string(), addr);
        Ok(addr)
    }

    /// Resolve a function described by `signature`
    pub fn function(
        library: &Arc<NativeLibrary>,
        signature: NativeSignature,
    ) -> Result<NativeFunction, NativeError> {
        validate_signature(&signature)?;
        let addr = library.symbol(&signature.name)?;
        Ok(NativeFunction {
            library: Arc::clone(library),
            addr,
            signature,
        })
    }
}

/// Reject signatures the word-based call path cannot express
pub(crate) fn validate_signature(signature: &NativeSignature) -> Result<(), NativeError> {
    if signature.params.len() > MAX_NATIVE_ARGS {
        return Err(NativeError::TooManyParams(signature.params.len()));
    }
    // Variadic arguments follow a different calling convention on some targets
    if signature.variadic {
        return Err(NativeError::InvalidSignature(format!(
            "variadic functions are not supported in native calls: {}",
            signature
        )));
    }
    // Arguments travel in integer registers only
    if signature.return_type.is_float() || signature.params.iter().any(|t| t.is_float()) {
        return Err(NativeError::InvalidSignature(format!(
            "floating-point types are not supported in native calls: {}",
            signature
        )));
    }
    if signature.params.contains(&NativeType::Void) {
        return Err(NativeError::InvalidSignature(format!(
            "void is not a parameter type: {}",
            signature
        )));
    }
    Ok(())
}

/// A native function exposed to the bridge as a foreign callable
pub struct NativeFunction {
    /// Keeps the library mapped while the function is reachable
    library: Arc<NativeLibrary>,
    addr: usize,
    signature: NativeSignature,
}

impl NativeFunction {
    pub fn signature(&self) -> &NativeSignature {
        &self.signature
    }

    /// Wrap as a foreign value carrying the signature's arity
    pub fn into_value(self) -> ForeignValue {
        let arity = self.signature.arity();
        ForeignValue::callable(Arc::new(self), arity)
    }
}

impl ForeignCallable for NativeFunction {
    fn call(&self, args: &[ForeignValue]) -> Result<ForeignValue, ForeignError> {
        // The invoker has already run check_args; direct callers have not
        self.check_args(args)
            .map_err(|e| ForeignError::new(format!("{}: {}", self.signature.name, e)))?;

        // C strings must outlive the call
        let mut strings: Vec<CString> = Vec::new();
        let mut words = [0u64; MAX_NATIVE_ARGS];
        for (index, arg) in args.iter().enumerate() {
            words[index] = marshal_arg(index, arg, &mut strings)
                .map_err(|e| ForeignError::new(format!("{}: {}", self.signature.name, e)))?;
        }
        log::trace!(
            "native call {} words={:?}",
            self.signature.name,
            &words[..args.len()]
        );

        // Safety: the address was resolved from a loaded library (kept alive
        // by `self.library`), the signature passed validate_signature, and
        // every argument matches its declared parameter type.
        let raw = unsafe { call_words(self.addr, args.len(), &words) };

        Ok(convert_result(raw, self.signature.return_type))
    }

    fn check_args(&self, args: &[ForeignValue]) -> Result<(), ArgumentError> {
        let params = &self.signature.params;
        for (index, arg) in args.iter().enumerate() {
            let ty = params.get(index).copied().ok_or_else(|| {
                ArgumentError::new(
                    index,
                    format!("{} takes {} argument(s)", self.signature.name, params.len()),
                )
            })?;
            check_arg(index, arg, ty)?;
        }
        if args.len() < params.len() {
            return Err(ArgumentError::new(
                args.len(),
                format!("missing {} argument", params[args.len()]),
            ));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{} [{}]", self.signature, self.library.path().display())
    }
}

/// Check that `arg` may be passed as a parameter of type `ty`.
///
/// `cstr` takes strings or null, `ptr` takes pointers or null, integer and
/// bool parameters take ints or bools. Everything else is refused.
fn check_arg(index: usize, arg: &ForeignValue, ty: NativeType) -> Result<(), ArgumentError> {
    let accepted = match ty {
        NativeType::CStr => match arg {
            ForeignValue::Null => true,
            ForeignValue::Primitive(Primitive::String(s)) => {
                if s.contains('\0') {
                    return Err(ArgumentError::new(index, "string contains a NUL byte"));
                }
                true
            }
            _ => false,
        },
        NativeType::Ptr => matches!(arg, ForeignValue::Null | ForeignValue::Pointer(_)),
        NativeType::Bool
        | NativeType::U8
        | NativeType::U16
        | NativeType::U32
        | NativeType::U64
        | NativeType::I8
        | NativeType::I16
        | NativeType::I32
        | NativeType::I64 => matches!(
            arg,
            ForeignValue::Primitive(Primitive::Int(_) | Primitive::Bool(_))
        ),
        NativeType::Void | NativeType::F32 | NativeType::F64 => false,
    };

    if accepted {
        Ok(())
    } else {
        Err(ArgumentError::new(
            index,
            format!("cannot pass {} as {}", arg_kind(arg), ty),
        ))
    }
}

fn arg_kind(arg: &ForeignValue) -> &'static str {
    match arg {
        ForeignValue::Primitive(Primitive::Bool(_)) => "bool",
        ForeignValue::Primitive(Primitive::Int(_)) => "int",
        ForeignValue::Primitive(Primitive::Float(_)) => "float",
        ForeignValue::Primitive(Primitive::String(_)) => "string",
        other => other.tag().as_str(),
    }
}

/// Convert a checked argument into a machine word
fn marshal_arg(
    index: usize,
    arg: &ForeignValue,
    strings: &mut Vec<CString>,
) -> Result<u64, ArgumentError> {
    let word = match arg {
        ForeignValue::Null => 0,
        ForeignValue::Pointer(p) => p.0 as u64,
        ForeignValue::Primitive(Primitive::Bool(b)) => *b as u64,
        ForeignValue::Primitive(Primitive::Int(i)) => *i as u64,
        ForeignValue::Primitive(Primitive::String(s)) => {
            let c = CString::new(s.as_str())
                .map_err(|_| ArgumentError::new(index, "string contains a NUL byte"))?;
            let ptr = c.as_ptr() as u64;
            strings.push(c);
            ptr
        }
        other => {
            return Err(ArgumentError::new(
                index,
                format!("cannot marshal {}", arg_kind(other)),
            ))
        }
    };
    Ok(word)
}

/// Convert a raw return word according to the declared return type
fn convert_result(value: u64, return_type: NativeType) -> ForeignValue {
    match return_type {
        NativeType::Void => ForeignValue::Null,
        NativeType::Bool => ForeignValue::from(value as u8 != 0),
        NativeType::U8 => ForeignValue::from(value as u8 as i64),
        NativeType::U16 => ForeignValue::from(value as u16 as i64),
        NativeType::U32 => ForeignValue::from(value as u32 as i64),
        NativeType::U64 => ForeignValue::from(value as i64),
        NativeType::I8 => ForeignValue::from(value as i8 as i64),
        NativeType::I16 => ForeignValue::from(value as i16 as i64),
        NativeType::I32 => ForeignValue::from(value as i32 as i64),
        NativeType::I64 => ForeignValue::from(value as i64),
        NativeType::F32 => ForeignValue::from(f32::from_bits(value as u32) as f64),
        NativeType::F64 => ForeignValue::from(f64::from_bits(value)),
        NativeType::Ptr | NativeType::CStr => ForeignValue::pointer(value as usize),
    }
}

/// Dispatch on argument count. Rust needs the exact parameter count at
/// compile time, so each arity has its own function-pointer type.
unsafe fn call_words(addr: usize, count: usize, w: &[u64; MAX_NATIVE_ARGS]) -> u64 {
    type Fn0 = extern "C" fn() -> u64;
    type Fn1 = extern "C" fn(u64) -> u64;
    type Fn2 = extern "C" fn(u64, u64) -> u64;
    type Fn3 = extern "C" fn(u64, u64, u64) -> u64;
    type Fn4 = extern "C" fn(u64, u64, u64, u64) -> u64;
    type Fn5 = extern "C" fn(u64, u64, u64, u64, u64) -> u64;
    type Fn6 = extern "C" fn(u64, u64, u64, u64, u64, u64) -> u64;

    match count {
        0 => std::mem::transmute::<usize, Fn0>(addr)(),
        1 => std::mem::transmute::<usize, Fn1>(addr)(w[0]),
        2 => std::mem::transmute::<usize, Fn2>(addr)(w[0], w[1]),
        3 => std::mem::transmute::<usize, Fn3>(addr)(w[0], w[1], w[2]),
        4 => std::mem::transmute::<usize, Fn4>(addr)(w[0], w[1], w[2], w[3]),
        5 => std::mem::transmute::<usize, Fn5>(addr)(w[0], w[1], w[2], w[3], w[4]),
        _ => std::mem::transmute::<usize, Fn6>(addr)(w[0], w[1], w[2], w[3], w[4], w[5]),
    }
}

/// Library loader with search paths
pub struct LibraryLoader {
    search_paths: Vec<PathBuf>,
    /// Loaded libraries by configured name
    libraries: HashMap<String, Arc<NativeLibrary>>,
}

impl LibraryLoader {
    pub fn new() -> Self {
        Self {
            search_paths: DEFAULT_SEARCH_PATHS.clone(),
            libraries: HashMap::new(),
        }
    }

    pub fn add_search_path(&mut self, path: impl AsRef<Path>) {
        self.search_paths.push(path.as_ref().to_path_buf());
    }

    /// Find a library file by name in the search paths
    pub fn find_library(&self, name: &str) -> Option<PathBuf> {
        let path = Path::new(name);
        if path.exists() {
            return Some(path.to_path_buf());
        }

        let candidates = [name.to_string(), library_filename(name)];
        for search_path in &self.search_paths {
            for candidate in &candidates {
                let full_path = search_path.join(candidate);
                if full_path.exists() {
                    return Some(full_path);
                }
            }
        }

        None
    }

    /// Load a library under `name`, from `path` if given
    pub fn load(
        &mut self,
        name: &str,
        path: Option<&str>,
    ) -> Result<Arc<NativeLibrary>, NativeError> {
        if let Some(lib) = self.libraries.get(name) {
            return Ok(Arc::clone(lib));
        }

        let target = path.unwrap_or(name);
        let library = match self.find_library(target) {
            Some(found) => NativeLibrary::load(found)?,
            None => {
                // Let the platform loader search its own paths (ldconfig cache etc.)
                log::warn!(
                    "library '{}' not found in search paths; deferring to system loader",
                    target
                );
                NativeLibrary::load(target)?
            }
        };

        log::debug!("loaded library '{}' from {}", name, library.path().display());
        let lib = Arc::new(library);
        self.libraries.insert(name.to_string(), Arc::clone(&lib));
        Ok(lib)
    }

    pub fn get(&self, name: &str) -> Option<Arc<NativeLibrary>> {
        self.libraries.get(name).cloned()
    }

    /// Resolve `signature` from the library loaded under `library`
    pub fn function(
        &self,
        library: &str,
        signature: NativeSignature,
    ) -> Result<NativeFunction, NativeError> {
        let lib = self
            .get(library)
            .ok_or_else(|| NativeError::LibraryNotLoaded(library.to_string()))?;
        NativeLibrary::function(&lib, signature)
    }

    /// Names of loaded libraries, sorted
    pub fn loaded_libraries(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.libraries.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for LibraryLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Get the default library search paths for this platform
fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd);
    }

    #[cfg(target_os = "linux")]
    {
        paths.push(PathBuf::from("/usr/lib"));
        paths.push(PathBuf::from("/usr/local/lib"));
        paths.push(PathBuf::from("/lib"));
        paths.push(PathBuf::from("/lib64"));
        paths.push(PathBuf::from("/usr/lib64"));

        if let Ok(ld_path) = std::env::var("LD_LIBRARY_PATH") {
            paths.extend(ld_path.split(':').filter(|p| !p.is_empty()).map(PathBuf::from));
        }
    }

    #[cfg(target_os = "macos")]
    {
        paths.push(PathBuf::from("/usr/lib"));
        paths.push(PathBuf::from("/usr/local/lib"));
        paths.push(PathBuf::from("/opt/homebrew/lib"));

        if let Ok(dyld_path) = std::env::var("DYLD_LIBRARY_PATH") {
            paths.extend(dyld_path.split(':').filter(|p| !p.is_empty()).map(PathBuf::from));
        }
    }

    #[cfg(target_os = "windows")]
    {
        paths.push(PathBuf::from("C:\\Windows\\System32"));

        if let Ok(path) = std::env::var("PATH") {
            paths.extend(path.split(';').filter(|p| !p.is_empty()).map(PathBuf::from));
        }
    }

    paths
}

/// Construct the platform-specific library filename
fn library_filename(name: &str) -> String {
    #[cfg(target_os = "linux")]
    {
        if name.starts_with("lib") && name.contains(".so") {
            name.to_string()
        } else {
            format!("lib{}.so", name)
        }
    }

    #[cfg(target_os = "macos")]
    {
        if name.starts_with("lib") && name.ends_with(".dylib") {
            name.to_string()
        } else {
            format!("lib{}.dylib", name)
        }
    }

    #[cfg(target_os = "windows")]
    {
        if name.ends_with(".dll") {
            name.to_string()
        } else {
            format!("{}.dll", name)
        }
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        name.to_string()
    }
}

#[cfg(test)]
pub(crate) fn test_check(arg: &ForeignValue, ty: NativeType) -> Result<(), ArgumentError> {
    check_arg(0, arg, ty)
}

#[cfg(test)]
pub(crate) fn test_marshal(arg: &ForeignValue, ty: NativeType) -> Result<u64, ArgumentError> {
    check_arg(0, arg, ty)?;
    let mut strings = Vec::new();
    marshal_arg(0, arg, &mut strings)
}

#[cfg(test)]
pub(crate) fn test_convert(value: u64, ty: NativeType) -> ForeignValue {
    convert_result(value, ty)
}
