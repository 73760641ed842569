// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compiler configuration, stored as RON.

use crate::types::{Type, DEFAULT_PRINT_DEPTH};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current configuration format version
pub const CONFIG_FORMAT_VERSION: u32 = 1;

/// Backend whose definitions are used when none is configured
pub const DEFAULT_BACKEND: &str = "cpu";

/// Type a compiled graph must produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputContract {
    /// A frame buffer
    #[default]
    Image,
    /// A scalar
    Float,
    /// An integer
    Int,
    /// A boolean
    Bool,
    /// An affine transform
    Transform,
    /// Any type
    Any,
}

impl OutputContract {
    /// The expected output type
    pub fn ty(&self) -> Type {
        match self {
            Self::Image => Type::image(),
            Self::Float => Type::float(),
            Self::Int => Type::int(),
            Self::Bool => Type::bool(),
            Self::Transform => Type::transform(),
            Self::Any => Type::fresh_var(),
        }
    }
}

/// Error loading or saving a configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read or written
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid RON for this format
    #[error("Config parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Value could not be serialized
    #[error("Config serialize error: {0}")]
    Serialize(#[from] ron::Error),

    /// Written by a newer version
    #[error("Config version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Newest version this build reads
        supported: u32,
    },
}

/// Settings for one compiler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Format version
    pub version: u32,
    /// Backend whose definitions are eligible
    pub backend: String,
    /// Declared output contract
    pub output: OutputContract,
    /// Depth cap when rendering types in diagnostics
    pub type_print_depth: usize,
    /// Run the optimize hook
    pub optimize: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_FORMAT_VERSION,
            backend: DEFAULT_BACKEND.to_string(),
            output: OutputContract::default(),
            type_print_depth: DEFAULT_PRINT_DEPTH,
            optimize: true,
        }
    }
}

impl CompilerConfig {
    /// Parse from a RON string
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: CompilerConfig = ron::from_str(text)?;
        if config.version > CONFIG_FORMAT_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: config.version,
                supported: CONFIG_FORMAT_VERSION,
            });
        }
        Ok(config)
    }

    /// Render as pretty RON
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        let pretty = ron::ser::PrettyConfig::default().struct_names(true);
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }

    /// Load from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Save to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CompilerConfig::default();
        assert_eq!(config.backend, "cpu");
        assert_eq!(config.output, OutputContract::Image);
        assert_eq!(config.type_print_depth, 48);
        assert!(config.optimize);
    }

    #[test]
    fn test_serialization() {
        let config = CompilerConfig {
            output: OutputContract::Float,
            backend: "gpu".into(),
            ..CompilerConfig::default()
        };
        let text = config.to_ron().unwrap();
        assert_eq!(CompilerConfig::from_ron(&text).unwrap(), config);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = CompilerConfig::from_ron("(output: Transform)").unwrap();
        assert_eq!(config.output, OutputContract::Transform);
        assert_eq!(config.backend, "cpu");
    }

    #[test]
    fn test_newer_version_rejected() {
        let err = CompilerConfig::from_ron("(version: 99)").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedVersion { found: 99, .. }));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("lumen-config-{}.ron", uuid::Uuid::new_v4()));
        let config = CompilerConfig::default();
        config.save(&path).unwrap();
        assert_eq!(CompilerConfig::load(&path).unwrap(), config);
        std::fs::remove_file(&path).unwrap();
    }
}
