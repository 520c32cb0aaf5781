//! Interop Capability Bridge
//!
//! Resolves exported names into foreign handles, answers capability
//! questions about them, and invokes foreign callables.
//!
//! # Architecture
//!
//! ```text
//! Native caller
//!       │
//!       ▼
//! Bridge::import("foreign")
//!       │
//!       ▼
//! SymbolRegistry (populated by the embedding runtime)
//!       │
//!       ▼
//! ForeignHandle ──► Bridge::probe (CapabilityProbe, no foreign entry)
//!       │
//!       ▼
//! Bridge::execute ──► Invoker (tag, arity, check_args) ──► ForeignCallable
//! ```
//!
//! # Example
//!
//! ```
//! use polybridge::interop::{Arity, Bridge, Capability, ForeignValue, SymbolRegistry};
//!
//! let mut registry = SymbolRegistry::new();
//! registry.register("foreign", ForeignValue::executable(Arity::Exact(0), |_| {
//!     Ok(ForeignValue::from(42i64))
//! }));
//!
//! let bridge = Bridge::new(registry);
//! let handle = bridge.import("foreign").unwrap();
//! assert!(bridge.probe(&handle, Capability::Executable));
//!
//! let result = bridge.execute(&handle, &[]).unwrap();
//! assert_eq!(result.value().as_int(), Some(42));
//! ```

mod bridge;
mod capability;
mod error;
mod handle;
mod invoker;
mod registry;
mod types;

pub use bridge::Bridge;
pub use capability::{Capability, CapabilityProbe, CapabilitySet};
pub use error::{ArgumentError, ForeignError, InteropError, InteropResult};
pub use handle::ForeignHandle;
pub use invoker::Invoker;
pub use registry::SymbolRegistry;
pub use types::{
    ArrayAccessor, ArrayRef, Arity, ExecutableRef, ForeignCallable, ForeignValue, HostArray,
    HostObject, MemberAccessor, ObjectRef, Primitive, RawHandle, VariantTag,
};
