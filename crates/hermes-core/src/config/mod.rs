//! Configuration management for Hermes.
//!
//! Supports three-layer configuration loading:
//! 1. Built-in defaults
//! 2. TOML config file (`~/.hermes/config.toml`)
//! 3. Environment variable overrides (`HERMES_` prefix)
//!
//! CLI flag overrides are applied by the binary crate after loading.

mod defaults;
mod env_overrides;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration for the Hermes agent pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Which LLM provider family to use: "openai" (general, OpenAI-compatible)
    /// or "google" (Gemini family). Anthropic is also supported natively but
    /// is selected explicitly via `"anthropic"`.
    #[serde(default = "defaults::llm_provider")]
    pub llm_provider: String,

    /// API key for the configured LLM provider.
    #[serde(default)]
    pub llm_api_key: Option<String>,

    /// Override base URL for the LLM provider (e.g. a self-hosted
    /// OpenAI-compatible endpoint).
    #[serde(default)]
    pub llm_provider_url: Option<String>,

    /// Model name used for the higher-capability ("strong") LLM calls
    /// (Classifier, Fulfiller).
    #[serde(default = "defaults::llm_strong_model_name")]
    pub llm_strong_model_name: String,

    /// Model name used for the lower-cost ("weak") LLM calls (Advisor,
    /// Composer).
    #[serde(default = "defaults::llm_weak_model_name")]
    pub llm_weak_model_name: String,

    /// Embedding model name used by the vector index.
    #[serde(default = "defaults::embedding_model_name")]
    pub embedding_model_name: String,

    /// Dimensionality of the embedding vectors stored in the vector index.
    #[serde(default = "defaults::chroma_embedding_dim")]
    pub chroma_embedding_dim: u32,

    /// Filesystem path for the persisted vector index.
    #[serde(default = "defaults::chroma_db_path")]
    pub chroma_db_path: String,

    /// Collection name within the vector index.
    #[serde(default = "defaults::chroma_collection_name")]
    pub chroma_collection_name: String,

    /// Path to a YAML/JSON file of promotion specifications applied by the
    /// promotion engine.
    #[serde(default)]
    pub promotion_specs: Option<String>,

    /// Identifier of the input spreadsheet/source for the customer emails
    /// (when not reading from a local file).
    #[serde(default)]
    pub input_spreadsheet_id: Option<String>,

    /// Identifier of the output spreadsheet to publish results to.
    #[serde(default)]
    pub output_spreadsheet_id: Option<String>,

    /// Sheet/tab name within the output spreadsheet.
    #[serde(default = "defaults::output_spreadsheet_name")]
    pub output_spreadsheet_name: String,

    /// Maximum number of emails processed in a single batch run (0 = no
    /// limit).
    #[serde(default)]
    pub hermes_processing_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_provider: defaults::llm_provider(),
            llm_api_key: None,
            llm_provider_url: None,
            llm_strong_model_name: defaults::llm_strong_model_name(),
            llm_weak_model_name: defaults::llm_weak_model_name(),
            embedding_model_name: defaults::embedding_model_name(),
            chroma_embedding_dim: defaults::chroma_embedding_dim(),
            chroma_db_path: defaults::chroma_db_path(),
            chroma_collection_name: defaults::chroma_collection_name(),
            promotion_specs: None,
            input_spreadsheet_id: None,
            output_spreadsheet_id: None,
            output_spreadsheet_name: defaults::output_spreadsheet_name(),
            hermes_processing_limit: 0,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file with environment variable overrides.
    ///
    /// The loading sequence:
    /// 1. Determine config file path (argument > `HERMES_CONFIG` env var > default)
    /// 2. Parse TOML file (or use defaults if the default path doesn't exist)
    /// 3. Apply environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Config, ConfigError> {
        let (path, explicit) = Self::resolve_config_path(config_path);

        let mut config = match std::fs::read_to_string(&path) {
            Ok(contents) => {
                toml::from_str::<Config>(&contents).map_err(|e| ConfigError::ParseError { source: e })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if explicit {
                    return Err(ConfigError::FileNotFound {
                        path: path.display().to_string(),
                    });
                }
                Config::default()
            }
            Err(_) => {
                return Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
        };

        config.apply_env_overrides()?;

        Ok(config)
    }

    /// Validate the configuration, returning all errors found (not just the first).
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        match self.llm_provider.as_str() {
            "openai" | "google" | "anthropic" | "ollama" => {}
            other => errors.push(ConfigError::InvalidValue {
                field: "llm_provider".to_string(),
                message: format!("'{other}' is not a supported LLM provider"),
            }),
        }

        if self.llm_provider != "ollama" && self.llm_api_key.as_deref().unwrap_or("").is_empty() {
            errors.push(ConfigError::MissingField {
                field: format!("llm_api_key (required for {} provider)", self.llm_provider),
            });
        }

        if self.chroma_embedding_dim == 0 {
            errors.push(ConfigError::InvalidValue {
                field: "chroma_embedding_dim".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn resolve_config_path(config_path: Option<&str>) -> (PathBuf, bool) {
        if let Some(path) = config_path {
            return (expand_tilde(path), true);
        }

        if let Ok(env_path) = std::env::var("HERMES_CONFIG") {
            return (expand_tilde(&env_path), true);
        }

        (expand_tilde("~/.hermes/config.toml"), false)
    }
}

/// Expand `~` at the start of a path to the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_valid_toml() {
        let toml_str = r#"
llm_provider = "anthropic"
llm_api_key = "sk-test"
llm_strong_model_name = "claude-sonnet-4-5-20250514"
hermes_processing_limit = 50
"#;
        let config: Config = toml::from_str(toml_str).expect("valid TOML");
        assert_eq!(config.llm_provider, "anthropic");
        assert_eq!(config.llm_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.hermes_processing_limit, 50);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let toml_str = r#"
llm_provider = "openai"
"#;
        let config: Config = toml::from_str(toml_str).expect("valid TOML");
        assert_eq!(config.chroma_embedding_dim, defaults::chroma_embedding_dim());
        assert_eq!(config.chroma_collection_name, defaults::chroma_collection_name());
        assert_eq!(config.output_spreadsheet_name, defaults::output_spreadsheet_name());
    }

    #[test]
    fn validate_rejects_unknown_provider() {
        let mut config = Config::default();
        config.llm_provider = "bogus".to_string();
        let errors = config.validate().unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidValue { field, .. } if field == "llm_provider")));
    }

    #[test]
    fn validate_requires_api_key_unless_ollama() {
        let mut config = Config::default();
        config.llm_provider = "openai".to_string();
        config.llm_api_key = None;
        let errors = config.validate().unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::MissingField { field } if field.contains("llm_api_key"))));

        config.llm_provider = "ollama".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_file_not_found_explicit_path() {
        let result = Config::load(Some("/nonexistent/path/hermes.toml"));
        assert!(result.is_err());
        match result.unwrap_err() {
            ConfigError::FileNotFound { path } => assert_eq!(path, "/nonexistent/path/hermes.toml"),
            other => panic!("expected FileNotFound, got: {other}"),
        }
    }

    #[test]
    fn expand_tilde_works() {
        let expanded = expand_tilde("~/.hermes/config.toml");
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }
}
