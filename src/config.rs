//! Bridge Configuration
//!
//! Handles parsing of `polybridge.toml`, which declares the libraries to
//! load and the symbols the embedding exports to native callers.
//!
//! ```toml
//! [bridge]
//! catch_panics = true
//! search_paths = ["./lib"]
//!
//! [[library]]
//! name = "c"
//! path = "libc.so.6"
//!
//! [[symbol]]
//! name = "foreign"
//! kind = "native"
//! library = "c"
//! signature = "i32 getpid()"
//!
//! [[symbol]]
//! name = "answer"
//! kind = "int"
//! value = 42
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "polybridge.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Root configuration structure matching polybridge.toml.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BridgeConfig {
    /// Bridge behaviour
    #[serde(default)]
    pub bridge: BridgeSection,

    /// Shared libraries to load
    #[serde(default, rename = "library")]
    pub libraries: Vec<LibraryEntry>,

    /// Exported symbols
    #[serde(default, rename = "symbol")]
    pub symbols: Vec<SymbolEntry>,
}

impl BridgeConfig {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Find and load configuration by searching up from the given directory.
    ///
    /// Falls back to the default (empty) configuration when none is found.
    pub fn find_and_load(start_dir: &Path) -> ConfigResult<Self> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                log::debug!("using config {}", config_path.display());
                return Self::load(&config_path);
            }
            if !dir.pop() {
                return Ok(Self::default());
            }
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Look up a library entry by name
    pub fn library(&self, name: &str) -> Option<&LibraryEntry> {
        self.libraries.iter().find(|lib| lib.name == name)
    }
}

/// `[bridge]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeSection {
    /// Report panics in host callables as foreign failures
    #[serde(default = "default_true")]
    pub catch_panics: bool,

    /// Extra library search paths
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            catch_panics: true,
            search_paths: Vec::new(),
        }
    }
}

/// `[[library]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LibraryEntry {
    /// Name symbols refer to
    pub name: String,

    /// File path or system library name (defaults to `name`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// `[[symbol]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolEntry {
    /// Import name
    pub name: String,

    #[serde(flatten)]
    pub spec: SymbolSpec,
}

/// Value bound to a symbol, tagged by `kind`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SymbolSpec {
    Null,
    Bool {
        value: bool,
    },
    Int {
        value: i64,
    },
    Float {
        value: f64,
    },
    String {
        value: String,
    },
    Pointer {
        address: u64,
    },
    Array {
        #[serde(default)]
        elements: Vec<toml::Value>,
        #[serde(default)]
        mutable: bool,
    },
    Object {
        #[serde(default)]
        members: BTreeMap<String, toml::Value>,
        #[serde(default)]
        mutable: bool,
    },
    Native {
        library: String,
        signature: String,
    },
}
