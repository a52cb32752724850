//! Project configuration (prebake.toml)
//!
//! ```toml
//! [serializer]
//! inline-expressions = true
//! lazy-objects-runtime = "__lazy"
//! heap-graph-format = "dot-language"
//! ```

use prebake_engine::SerializerOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File looked up in the working directory when `--config` is not given
pub const CONFIG_FILE: &str = "prebake.toml";

/// Errors that can occur while loading the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the file
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Semantically invalid setting
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Contents of a prebake.toml
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Serializer options
    pub serializer: SerializerOptions,
}

impl Config {
    /// Parse a configuration from a string
    pub fn from_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `explicit`, or ./prebake.toml if it exists, or the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(CONFIG_FILE);
                if !default.is_file() {
                    return Ok(Config::default());
                }
                default
            }
        };
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Self::from_str(&content, &path)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(runtime) = &self.serializer.lazy_objects_runtime {
            if runtime.is_empty() {
                return Err(ConfigError::Invalid(
                    "lazy-objects-runtime must not be empty".to_string(),
                ));
            }
        }
        if self.serializer.max_call_depth == 0 {
            return Err(ConfigError::Invalid("max-call-depth must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prebake_engine::HeapGraphFormat;

    fn parse(content: &str) -> Result<Config, ConfigError> {
        Config::from_str(content, Path::new("prebake.toml"))
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_serializer_table() {
        let config = parse(
            r#"
[serializer]
inline-expressions = true
heap-graph-format = "vis-js"
lazy-objects-runtime = "__rt"
max-steps = 1000
"#,
        )
        .unwrap();
        assert!(config.serializer.inline_expressions);
        assert_eq!(config.serializer.heap_graph_format, Some(HeapGraphFormat::VisJs));
        assert_eq!(config.serializer.lazy_objects_runtime.as_deref(), Some("__rt"));
        assert_eq!(config.serializer.max_steps, 1000);
        assert!(!config.serializer.profile);
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let error = parse("[serializer\n").unwrap_err();
        assert!(matches!(error, ConfigError::Parse { .. }));
        assert!(error.to_string().contains("prebake.toml"));
    }

    #[test]
    fn test_unknown_table_is_rejected() {
        assert!(matches!(parse("[other]\nx = 1\n"), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_validation() {
        let error = parse("[serializer]\nlazy-objects-runtime = \"\"\n").unwrap_err();
        assert!(matches!(error, ConfigError::Invalid(_)));
    }
}
