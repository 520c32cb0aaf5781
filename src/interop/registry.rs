//! Symbol Registry
//!
//! Maps import names to foreign values. The embedding runtime populates it
//! during setup (`&mut self`); afterwards it is shared read-only, usually
//! behind an `Arc`.

use std::collections::HashMap;

use super::error::{InteropError, InteropResult};
use super::handle::ForeignHandle;
use super::types::ForeignValue;

/// Table of exported foreign symbols
#[derive(Debug, Default, Clone)]
pub struct SymbolRegistry {
    /// Registered symbols (import name -> value)
    symbols: HashMap<String, ForeignValue>,
}

impl SymbolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            symbols: HashMap::new(),
        }
    }

    /// Bind a name. Last registration wins; the displaced value is returned.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        value: ForeignValue,
    ) -> Option<ForeignValue> {
        let name = name.into();
        log::debug!("registering symbol '{}' ({})", name, value.tag());

        let previous = self.symbols.insert(name.clone(), value);
        if let Some(prev) = &previous {
            log::warn!(
                "symbol '{}' re-registered; replacing previous {} binding",
                name,
                prev.tag()
            );
        }
        previous
    }

    /// Resolve a name to a handle
    pub fn resolve(&self, name: &str) -> InteropResult<ForeignHandle> {
        self.symbols
            .get(name)
            .map(|value| ForeignHandle::new(value.clone()))
            .ok_or_else(|| InteropError::NameNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.symbols.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
