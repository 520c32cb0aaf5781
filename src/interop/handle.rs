//! Foreign Handles
//!
//! A `ForeignHandle` can only be produced by the crate itself (registry
//! resolution or an invocation result), so native callers never hold a
//! handle for a name that failed to resolve.

use super::capability::{Capability, CapabilityProbe, CapabilitySet};
use super::types::{ForeignValue, VariantTag};

/// Resolved foreign value with its capabilities computed up front
#[derive(Debug, Clone)]
pub struct ForeignHandle {
    value: ForeignValue,
    capabilities: CapabilitySet,
}

impl ForeignHandle {
    pub(crate) fn new(value: ForeignValue) -> Self {
        let capabilities = CapabilityProbe::capabilities(&value);
        Self {
            value,
            capabilities,
        }
    }

    /// The underlying foreign value
    pub fn value(&self) -> &ForeignValue {
        &self.value
    }

    pub fn tag(&self) -> VariantTag {
        self.value.tag()
    }

    pub fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    /// Whether both handles refer to the same foreign object
    pub fn same_object(&self, other: &ForeignHandle) -> bool {
        self.value.same_object(&other.value)
    }

    pub fn into_value(self) -> ForeignValue {
        self.value
    }
}

impl From<ForeignHandle> for ForeignValue {
    fn from(handle: ForeignHandle) -> Self {
        handle.value
    }
}

impl From<&ForeignHandle> for ForeignValue {
    fn from(handle: &ForeignHandle) -> Self {
        handle.value.clone()
    }
}
