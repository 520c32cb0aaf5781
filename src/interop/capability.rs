//! Capability Probe
//!
//! Stateless predicates over a foreign value's tag and accessor metadata.
//! Nothing here invokes foreign code.

use std::fmt;

use super::types::ForeignValue;

/// Capability a foreign value may have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Executable,
    Readable,
    Writable,
    Null,
    Array,
    Pointer,
}

impl Capability {
    pub const ALL: [Capability; 6] = [
        Capability::Executable,
        Capability::Readable,
        Capability::Writable,
        Capability::Null,
        Capability::Array,
        Capability::Pointer,
    ];

    const fn bit(self) -> u8 {
        match self {
            Capability::Executable => 0b00_0001,
            Capability::Readable => 0b00_0010,
            Capability::Writable => 0b00_0100,
            Capability::Null => 0b00_1000,
            Capability::Array => 0b01_0000,
            Capability::Pointer => 0b10_0000,
        }
    }

    /// Parse a capability name (`"executable"`, `"is_executable"`, ...)
    pub fn from_str(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();
        let name = lower.strip_prefix("is_").unwrap_or(&lower);
        match name {
            "executable" | "exec" | "callable" => Some(Capability::Executable),
            "readable" | "read" => Some(Capability::Readable),
            "writable" | "write" => Some(Capability::Writable),
            "null" => Some(Capability::Null),
            "array" => Some(Capability::Array),
            "pointer" | "ptr" => Some(Capability::Pointer),
            _ => None,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Executable => write!(f, "executable"),
            Capability::Readable => write!(f, "readable"),
            Capability::Writable => write!(f, "writable"),
            Capability::Null => write!(f, "null"),
            Capability::Array => write!(f, "array"),
            Capability::Pointer => write!(f, "pointer"),
        }
    }
}

/// Set of capabilities, computed once per handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn contains(&self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    pub fn insert(&mut self, capability: Capability) {
        self.0 |= capability.bit();
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterate the contained capabilities in declaration order
    pub fn iter(&self) -> impl Iterator<Item = Capability> {
        let set = *self;
        Capability::ALL.into_iter().filter(move |c| set.contains(*c))
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cap) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", cap)?;
        }
        Ok(())
    }
}

/// Capability predicates over foreign values
pub struct CapabilityProbe;

impl CapabilityProbe {
    /// Answer one capability question. Total: never fails.
    pub fn has(value: &ForeignValue, capability: Capability) -> bool {
        match capability {
            Capability::Executable => matches!(value, ForeignValue::Executable(_)),
            Capability::Readable => matches!(
                value,
                ForeignValue::Array(_) | ForeignValue::Object(_) | ForeignValue::Primitive(_)
            ),
            Capability::Writable => match value {
                ForeignValue::Array(a) => a.accessor().is_mutable(),
                ForeignValue::Object(o) => o.accessor().is_mutable(),
                _ => false,
            },
            Capability::Null => matches!(value, ForeignValue::Null),
            Capability::Array => matches!(value, ForeignValue::Array(_)),
            Capability::Pointer => matches!(value, ForeignValue::Pointer(_)),
        }
    }

    /// Probe by name; unknown names answer false
    pub fn has_named(value: &ForeignValue, name: &str) -> bool {
        Capability::from_str(name)
            .map(|cap| Self::has(value, cap))
            .unwrap_or(false)
    }

    /// Compute every capability of a value
    pub fn capabilities(value: &ForeignValue) -> CapabilitySet {
        let mut set = CapabilitySet::empty();
        for cap in Capability::ALL {
            if Self::has(value, cap) {
                set.insert(cap);
            }
        }
        set
    }
}
