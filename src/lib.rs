//! polybridge - Interop Capability Bridge
//!
//! Lets native code import values exported by an embedding runtime, ask
//! what those values can do, and call them when they are executable.
//!
//! # Features
//!
//! - **Import**: resolve exported names through an explicit `SymbolRegistry`
//! - **Capability probing**: executable, readable, writable, null, array,
//!   pointer, answered from the value's tag without entering foreign code
//! - **Guarded invocation**: tag, arity and argument types checked before
//!   control transfers; foreign failures come back as
//!   `InteropError::ForeignRaised`, rejected arguments as
//!   `InteropError::InvalidArgument`
//! - **Read protocol**: array size/elements and object members
//! - **Native backend**: C-ABI shared library functions via libloading
//! - **Configuration**: `polybridge.toml` declares libraries and symbols
//!
//! # Example
//!
//! ```rust
//! use polybridge::{Arity, Bridge, ForeignValue, InteropError, SymbolRegistry};
//!
//! let mut registry = SymbolRegistry::new();
//! registry.register("foreign", ForeignValue::executable(Arity::Exact(0), |_| {
//!     Ok(ForeignValue::from(true))
//! }));
//! let bridge = Bridge::new(registry);
//!
//! let handle = bridge.import("foreign").unwrap();
//! if bridge.is_executable(&handle) {
//!     let result = bridge.execute(&handle, &[]).unwrap();
//!     assert!(matches!(result.value().as_primitive(), Some(_)));
//! }
//!
//! assert!(matches!(bridge.import("missing"), Err(InteropError::NameNotFound(_))));
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  Native caller   │  import / probe / execute
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │     Bridge       │  facade, no state of its own
//! └────────┬─────────┘
//!     ┌────┴─────┬──────────────┐
//!     ▼          ▼              ▼
//! ┌────────┐ ┌──────────┐ ┌─────────┐
//! │Registry│ │  Probe   │ │ Invoker │
//! └───┬────┘ └──────────┘ └────┬────┘
//!     │                        │
//!     ▼                        ▼
//! ┌─────────────────────────────────┐
//! │ Embedding runtime (host values, │
//! │ native libraries)               │
//! └─────────────────────────────────┘
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod embed;
pub mod interop;
pub mod native;

// Re-export commonly used types
pub use config::{BridgeConfig, ConfigError, ConfigResult};
pub use embed::{build_bridge, build_registry, EmbedError, Embedding};
pub use interop::{
    ArgumentError, Arity, Bridge, Capability, CapabilityProbe, CapabilitySet, ForeignCallable,
    ForeignError, ForeignHandle, ForeignValue, HostArray, HostObject, InteropError, InteropResult,
    Invoker, Primitive, SymbolRegistry, VariantTag,
};
pub use native::{LibraryLoader, NativeError, NativeFunction, NativeSignature, NativeType};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
