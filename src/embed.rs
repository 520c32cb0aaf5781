//! Embedding Setup
//!
//! Populates a `SymbolRegistry` from a `BridgeConfig`. This is the setup
//! phase that precedes any native import: libraries are loaded, native
//! signatures resolved and every declared symbol registered.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{BridgeConfig, SymbolEntry, SymbolSpec};
use crate::interop::{Bridge, ForeignValue, HostArray, HostObject, Invoker, SymbolRegistry};
use crate::native::{LibraryLoader, NativeError, NativeSignature};

/// Errors raised while populating a registry
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("Symbol '{symbol}' refers to undeclared library '{library}'")]
    UnknownLibrary { symbol: String, library: String },

    #[error("Symbol '{symbol}' has an invalid signature: {signature}")]
    InvalidSignature { symbol: String, signature: String },

    #[error("Symbol '{symbol}': {source}")]
    Native {
        symbol: String,
        #[source]
        source: NativeError,
    },

    #[error(transparent)]
    Library(#[from] NativeError),
}

/// Registry plus the loader that keeps its native libraries mapped
pub struct Embedding {
    pub registry: SymbolRegistry,
    pub loader: LibraryLoader,
}

/// Load libraries and register every symbol declared in `config`
pub fn embed(config: &BridgeConfig) -> Result<Embedding, EmbedError> {
    let mut loader = LibraryLoader::new();
    for path in &config.bridge.search_paths {
        loader.add_search_path(path);
    }

    for lib in &config.libraries {
        loader.load(&lib.name, lib.path.as_deref())?;
    }

    let mut registry = SymbolRegistry::new();
    for entry in &config.symbols {
        let value = symbol_value(config, &loader, entry)?;
        registry.register(entry.name.clone(), value);
    }

    log::info!(
        "embedded {} symbol(s), libraries: {:?}",
        registry.len(),
        loader.loaded_libraries()
    );

    Ok(Embedding { registry, loader })
}

/// Build only the registry
pub fn build_registry(config: &BridgeConfig) -> Result<SymbolRegistry, EmbedError> {
    embed(config).map(|embedding| embedding.registry)
}

/// Build a bridge configured from `config`
pub fn build_bridge(config: &BridgeConfig) -> Result<Bridge, EmbedError> {
    let registry = build_registry(config)?;
    let invoker = Invoker::new().with_catch_panics(config.bridge.catch_panics);
    Ok(Bridge::new(registry).with_invoker(invoker))
}

/// Build the value a `[[symbol]]` entry declares
fn symbol_value(
    config: &BridgeConfig,
    loader: &LibraryLoader,
    entry: &SymbolEntry,
) -> Result<ForeignValue, EmbedError> {
    let value = match &entry.spec {
        SymbolSpec::Null => ForeignValue::Null,
        SymbolSpec::Bool { value } => ForeignValue::from(*value),
        SymbolSpec::Int { value } => ForeignValue::from(*value),
        SymbolSpec::Float { value } => ForeignValue::from(*value),
        SymbolSpec::String { value } => ForeignValue::from(value.as_str()),
        SymbolSpec::Pointer { address } => ForeignValue::pointer(*address as usize),
        SymbolSpec::Array { elements, mutable } => {
            let elements = elements.iter().map(toml_to_value).collect();
            ForeignValue::array(Arc::new(HostArray::new(elements, *mutable)))
        }
        SymbolSpec::Object { members, mutable } => {
            let members = members
                .iter()
                .map(|(k, v)| (k.clone(), toml_to_value(v)))
                .collect::<BTreeMap<_, _>>();
            ForeignValue::object(Arc::new(HostObject::new(members, *mutable)))
        }
        SymbolSpec::Native { library, signature } => {
            native_value(config, loader, &entry.name, library, signature)?
        }
    };
    Ok(value)
}

/// Resolve a `kind = "native"` symbol through the loader
fn native_value(
    config: &BridgeConfig,
    loader: &LibraryLoader,
    symbol: &str,
    library: &str,
    signature: &str,
) -> Result<ForeignValue, EmbedError> {
    if config.library(library).is_none() {
        return Err(EmbedError::UnknownLibrary {
            symbol: symbol.to_string(),
            library: library.to_string(),
        });
    }
    let sig = NativeSignature::parse(signature).ok_or_else(|| EmbedError::InvalidSignature {
        symbol: symbol.to_string(),
        signature: signature.to_string(),
    })?;
    let function = loader
        .function(library, sig)
        .map_err(|source| EmbedError::Native {
            symbol: symbol.to_string(),
            source,
        })?;
    Ok(function.into_value())
}

/// Nested TOML data becomes immutable host containers
fn toml_to_value(value: &toml::Value) -> ForeignValue {
    match value {
        toml::Value::String(s) => ForeignValue::from(s.as_str()),
        toml::Value::Integer(i) => ForeignValue::from(*i),
        toml::Value::Float(f) => ForeignValue::from(*f),
        toml::Value::Boolean(b) => ForeignValue::from(*b),
        toml::Value::Datetime(dt) => ForeignValue::from(dt.to_string()),
        toml::Value::Array(items) => {
            let elements = items.iter().map(toml_to_value).collect();
            ForeignValue::array(Arc::new(HostArray::new(elements, false)))
        }
        toml::Value::Table(table) => {
            let members = table
                .iter()
                .map(|(k, v)| (k.clone(), toml_to_value(v)))
                .collect::<BTreeMap<_, _>>();
            ForeignValue::object(Arc::new(HostObject::new(members, false)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interop::{Capability, InteropError, VariantTag};

    #[test]
    fn test_embed_data_symbols() {
        let config = BridgeConfig::parse(
            r#"
[[symbol]]
name = "answer"
kind = "int"
value = 42

[[symbol]]
name = "list"
kind = "array"
elements = [1, [2, 3], { k = "v" }]
mutable = true

[[symbol]]
name = "addr"
kind = "pointer"
address = 4096
"#,
        )
        .unwrap();

        let bridge = build_bridge(&config).unwrap();

        let answer = bridge.import("answer").unwrap();
        assert!(!bridge.is_executable(&answer));
        assert!(bridge.probe(&answer, Capability::Readable));

        let list = bridge.import("list").unwrap();
        assert!(bridge.probe(&list, Capability::Writable));
        assert_eq!(bridge.get_size(&list).unwrap(), 3);
        let nested = bridge.read_element(&list, 1).unwrap();
        assert_eq!(nested.tag(), VariantTag::Array);
        assert!(!bridge.probe(&nested, Capability::Writable));
        let table = bridge.read_element(&list, 2).unwrap();
        assert_eq!(bridge.read_member(&table, "k").unwrap().value().as_str(), Some("v"));

        let addr = bridge.import("addr").unwrap();
        assert!(bridge.probe(&addr, Capability::Pointer));
    }

    #[test]
    fn test_embed_unknown_library() {
        let config = BridgeConfig::parse(
            r#"
[[symbol]]
name = "foreign"
kind = "native"
library = "guest"
signature = "int run()"
"#,
        )
        .unwrap();

        assert!(matches!(
            build_registry(&config),
            Err(EmbedError::UnknownLibrary { .. })
        ));
    }

    #[test]
    fn test_embed_duplicate_last_wins() {
        let config = BridgeConfig::parse(
            r#"
[[symbol]]
name = "foreign"
kind = "int"
value = 1

[[symbol]]
name = "foreign"
kind = "string"
value = "second"
"#,
        )
        .unwrap();

        let bridge = build_bridge(&config).unwrap();
        let handle = bridge.import("foreign").unwrap();
        assert_eq!(handle.value().as_str(), Some("second"));
        assert!(matches!(
            bridge.import("other"),
            Err(InteropError::NameNotFound(_))
        ));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_embed_native_symbol() {
        let config = BridgeConfig::parse(
            r#"
[[library]]
name = "c"
path = "libc.so.6"

[[symbol]]
name = "foreign"
kind = "native"
library = "c"
signature = "i32 getpid()"

[[symbol]]
name = "bad"
kind = "native"
library = "c"
signature = "not a signature"
"#,
        )
        .unwrap();

        // Only meaningful on hosts where the system loader finds glibc
        match build_registry(&config) {
            Err(EmbedError::InvalidSignature { symbol, .. }) => assert_eq!(symbol, "bad"),
            Err(EmbedError::Library(_)) => {}
            other => panic!("unexpected result: {:?}", other.map(|r| r.len())),
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_embed_rejects_variadic_native() {
        let config = BridgeConfig::parse(
            r#"
[[library]]
name = "c"
path = "libc.so.6"

[[symbol]]
name = "printf"
kind = "native"
library = "c"
signature = "int printf(const char* fmt, ...)"
"#,
        )
        .unwrap();

        // Nothing is registered for a signature the loader refuses
        match build_registry(&config) {
            Err(EmbedError::Native { symbol, source }) => {
                assert_eq!(symbol, "printf");
                assert!(matches!(source, NativeError::InvalidSignature(_)));
            }
            Err(EmbedError::Library(_)) => {}
            other => panic!("unexpected result: {:?}", other.map(|r| r.len())),
        }
    }
}
