//! Bridge Facade
//!
//! The only surface native code touches. Composes the registry, the
//! capability probe and the invoker without adding state of its own.

use std::sync::Arc;

use super::capability::{Capability, CapabilityProbe};
use super::error::{InteropError, InteropResult};
use super::handle::ForeignHandle;
use super::invoker::Invoker;
use super::registry::SymbolRegistry;
use super::types::ForeignValue;

/// Native-side entry point to the interop boundary
#[derive(Debug, Clone)]
pub struct Bridge {
    registry: Arc<SymbolRegistry>,
    invoker: Invoker,
}

impl Bridge {
    /// Create a bridge over a populated registry
    pub fn new(registry: SymbolRegistry) -> Self {
        Self::with_shared(Arc::new(registry))
    }

    /// Create a bridge over a registry shared with other bridges or threads
    pub fn with_shared(registry: Arc<SymbolRegistry>) -> Self {
        Self {
            registry,
            invoker: Invoker::new(),
        }
    }

    /// Replace the invoker configuration
    pub fn with_invoker(mut self, invoker: Invoker) -> Self {
        self.invoker = invoker;
        self
    }

    pub fn registry(&self) -> &Arc<SymbolRegistry> {
        &self.registry
    }

    // =========================================================================
    // Core protocol
    // =========================================================================

    /// Resolve an exported name
    pub fn import(&self, name: &str) -> InteropResult<ForeignHandle> {
        let handle = self.registry.resolve(name)?;
        log::debug!("imported '{}' as {} [{}]", name, handle.tag(), handle.capabilities());
        Ok(handle)
    }

    /// Answer a capability question about a handle
    pub fn probe(&self, handle: &ForeignHandle, capability: Capability) -> bool {
        handle.has(capability)
    }

    /// Probe by capability name; unknown names answer false
    pub fn probe_named(&self, handle: &ForeignHandle, name: &str) -> bool {
        Capability::from_str(name)
            .map(|cap| handle.has(cap))
            .unwrap_or(false)
    }

    pub fn is_executable(&self, handle: &ForeignHandle) -> bool {
        handle.has(Capability::Executable)
    }

    pub fn is_null(&self, handle: &ForeignHandle) -> bool {
        handle.has(Capability::Null)
    }

    /// Invoke a raw foreign value
    pub fn invoke(
        &self,
        value: &ForeignValue,
        args: &[ForeignValue],
    ) -> InteropResult<ForeignHandle> {
        self.invoker.invoke(value, args)
    }

    /// Execute a handle with arguments
    pub fn execute(
        &self,
        handle: &ForeignHandle,
        args: &[ForeignValue],
    ) -> InteropResult<ForeignHandle> {
        self.invoker.invoke(handle.value(), args)
    }

    // =========================================================================
    // Read-side protocol
    // =========================================================================

    /// Whether the handle reports a size (arrays only)
    pub fn has_size(&self, handle: &ForeignHandle) -> bool {
        handle.has(Capability::Array)
    }

    /// Number of elements of an array handle
    pub fn get_size(&self, handle: &ForeignHandle) -> InteropResult<usize> {
        match handle.value() {
            ForeignValue::Array(array) => Ok(array.accessor().len()),
            other => Err(InteropError::Unsupported {
                operation: "get_size",
                tag: other.tag(),
            }),
        }
    }

    /// Read one element of an array handle
    pub fn read_element(
        &self,
        handle: &ForeignHandle,
        index: usize,
    ) -> InteropResult<ForeignHandle> {
        match handle.value() {
            ForeignValue::Array(array) => {
                let accessor = array.accessor();
                accessor
                    .get(index)
                    .map(ForeignHandle::new)
                    .ok_or(InteropError::IndexOutOfBounds {
                        index,
                        len: accessor.len(),
                    })
            }
            other => Err(InteropError::Unsupported {
                operation: "read_element",
                tag: other.tag(),
            }),
        }
    }

    /// Read a member of an object handle
    pub fn read_member(&self, handle: &ForeignHandle, key: &str) -> InteropResult<ForeignHandle> {
        match handle.value() {
            ForeignValue::Object(object) => object
                .accessor()
                .get(key)
                .map(ForeignHandle::new)
                .ok_or_else(|| InteropError::NoSuchMember(key.to_string())),
            other => Err(InteropError::Unsupported {
                operation: "read_member",
                tag: other.tag(),
            }),
        }
    }

    /// Member names of an object handle
    pub fn keys(&self, handle: &ForeignHandle) -> InteropResult<Vec<String>> {
        match handle.value() {
            ForeignValue::Object(object) => Ok(object.accessor().keys()),
            other => Err(InteropError::Unsupported {
                operation: "keys",
                tag: other.tag(),
            }),
        }
    }

    /// Read a member and execute it
    pub fn invoke_member(
        &self,
        handle: &ForeignHandle,
        key: &str,
        args: &[ForeignValue],
    ) -> InteropResult<ForeignHandle> {
        let member = self.read_member(handle, key)?;
        self.execute(&member, args)
    }

    /// Capability check against a raw value, bypassing the cached set
    pub fn probe_value(&self, value: &ForeignValue, capability: Capability) -> bool {
        CapabilityProbe::has(value, capability)
    }
}
