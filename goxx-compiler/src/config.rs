//! Translator configuration and settings

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main translator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Package whose `main` becomes the program entry point
    pub entry_package: String,
    /// Name of the C++ support header included by every unit
    pub runtime_header: String,
    /// Write the support header next to the generated units
    pub emit_runtime: bool,
    /// Program-wide header holding forward declarations and hoisted aliases
    pub aux_header: String,
    /// Hoist complex map value types into shared aliases
    pub hoist_map_values: bool,
    /// Reorder named types so by-value dependencies come first
    pub order_type_declarations: bool,
    /// Mark locals captured by outliving closures
    pub annotate_escapes: bool,
    /// Remove the output directory before writing
    pub clear_output_dir: bool,
    pub indent_width: usize,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            entry_package: "main".to_string(),
            runtime_header: "goxx_runtime.h".to_string(),
            emit_runtime: true,
            aux_header: "goxx_aux.h".to_string(),
            hoist_map_values: true,
            order_type_declarations: true,
            annotate_escapes: true,
            clear_output_dir: true,
            indent_width: 4,
        }
    }
}

impl TranslatorConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e,
        })
    }

    /// Save configuration to TOML file
    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize { error: e })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                error: e,
            })?;
        }

        std::fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entry_package.is_empty() {
            return Err(ConfigError::invalid("entry_package", "Entry package must be named"));
        }

        for (field, value) in [
            ("runtime_header", &self.runtime_header),
            ("aux_header", &self.aux_header),
        ] {
            if value.is_empty() {
                return Err(ConfigError::invalid(field, "Header name must not be empty"));
            }
        }

        if self.aux_header == self.runtime_header {
            return Err(ConfigError::invalid(
                "aux_header",
                "Aux header must differ from the runtime header",
            ));
        }

        if self.indent_width > 16 {
            return Err(ConfigError::invalid("indent_width", "Indent width must be 0-16"));
        }

        Ok(())
    }

    /// Merge with another configuration (other takes precedence)
    pub fn merge(&mut self, other: TranslatorConfig) {
        let defaults = TranslatorConfig::default();
        if other.entry_package != defaults.entry_package {
            self.entry_package = other.entry_package;
        }
        if other.runtime_header != defaults.runtime_header {
            self.runtime_header = other.runtime_header;
        }
        if other.aux_header != defaults.aux_header {
            self.aux_header = other.aux_header;
        }
        if other.indent_width != defaults.indent_width {
            self.indent_width = other.indent_width;
        }
        if !other.emit_runtime {
            self.emit_runtime = false;
        }
        if !other.hoist_map_values {
            self.hoist_map_values = false;
        }
        if !other.order_type_declarations {
            self.order_type_declarations = false;
        }
        if !other.annotate_escapes {
            self.annotate_escapes = false;
        }
        if !other.clear_output_dir {
            self.clear_output_dir = false;
        }
    }

    pub fn runtime_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(&self.runtime_header)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error for {path:?}: {error}")]
    Io { path: PathBuf, error: std::io::Error },

    #[error("Parse error for {path:?}: {error}")]
    Parse { path: PathBuf, error: toml::de::Error },

    #[error("Serialization error: {error}")]
    Serialize { error: toml::ser::Error },

    #[error("Invalid configuration for {field}: {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    fn invalid(field: &str, message: &str) -> Self {
        Self::Invalid {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// Predefined configurations
pub mod presets {
    use super::*;

    /// Everything on, the usual setting
    pub fn standard() -> TranslatorConfig {
        TranslatorConfig::default()
    }

    /// Output that is easiest to diff against the input: no reordering and
    /// no alias hoisting
    pub fn literal() -> TranslatorConfig {
        TranslatorConfig {
            hoist_map_values: false,
            order_type_declarations: false,
            ..TranslatorConfig::default()
        }
    }

    /// Units only, for builds that ship their own support header
    pub fn external_runtime(header: &str) -> TranslatorConfig {
        TranslatorConfig {
            runtime_header: header.to_string(),
            emit_runtime: false,
            ..TranslatorConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = TranslatorConfig::default();
        assert_eq!(config.entry_package, "main");
        assert!(config.emit_runtime);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = TranslatorConfig::default();
        config.indent_width = 40;
        assert!(config.validate().is_err());

        config.indent_width = 2;
        config.aux_header = config.runtime_header.clone();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field, .. }) if field == "aux_header"
        ));
    }

    #[test]
    fn test_config_file_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("goxx.toml");

        let mut config = TranslatorConfig::default();
        config.annotate_escapes = false;
        config.entry_package = "cmd".to_string();

        config.to_file(&config_path).unwrap();
        let loaded = TranslatorConfig::from_file(&config_path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("goxx.toml");
        std::fs::write(&config_path, "indent_width = 2\n").unwrap();

        let loaded = TranslatorConfig::from_file(&config_path).unwrap();
        assert_eq!(loaded.indent_width, 2);
        assert_eq!(loaded.runtime_header, "goxx_runtime.h");
    }

    #[test]
    fn test_config_merge() {
        let mut base = TranslatorConfig::default();
        let mut other = presets::literal();
        other.entry_package = "app".to_string();

        base.merge(other);

        assert_eq!(base.entry_package, "app");
        assert!(!base.hoist_map_values);
        assert!(!base.order_type_declarations);
        assert!(base.emit_runtime);
    }
}
