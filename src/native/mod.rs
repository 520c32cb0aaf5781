//! Native Runtime Backend
//!
//! Exposes functions from C-ABI shared libraries (C, or Go built with
//! `-buildmode=c-shared`) as foreign callables.
//!
//! # Architecture
//!
//! ```text
//! polybridge.toml [[symbol]] kind = "native"
//!       │
//!       ▼
//! NativeSignature::parse("i32 getpid()")
//!       │
//!       ▼
//! LibraryLoader (libloading) ──► NativeFunction
//!       │
//!       ▼
//! SymbolRegistry::register(name, ForeignValue::Executable)
//! ```
//!
//! Arguments are passed as machine words: integers, booleans, pointers and
//! strings (as temporary C strings valid for the duration of the call).
//! Results come back by declared return type; `char*` results are returned
//! as raw pointers and never read or freed by the bridge.

mod loader;
mod signature;

pub use loader::{LibraryLoader, NativeError, NativeFunction, NativeLibrary, MAX_NATIVE_ARGS};
pub use signature::{NativeSignature, NativeType};

#[cfg(test)]
mod tests;
