//! Environment variable overrides for [`super::Config`].
//!
//! Variables use the `HERMES_` prefix, matching field names directly
//! (the config is flat, unlike the teacher's nested sections, so no `__`
//! separator is needed here).

use super::Config;
use crate::error::ConfigError;
use std::env;

impl Config {
    /// Apply environment variable overrides to the configuration.
    pub(super) fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = env::var("HERMES_LLM_PROVIDER") {
            self.llm_provider = val;
        }
        if let Ok(val) = env::var("HERMES_LLM_API_KEY") {
            self.llm_api_key = Some(val);
        }
        if let Ok(val) = env::var("HERMES_LLM_PROVIDER_URL") {
            self.llm_provider_url = Some(val);
        }
        if let Ok(val) = env::var("HERMES_LLM_STRONG_MODEL_NAME") {
            self.llm_strong_model_name = val;
        }
        if let Ok(val) = env::var("HERMES_LLM_WEAK_MODEL_NAME") {
            self.llm_weak_model_name = val;
        }
        if let Ok(val) = env::var("HERMES_EMBEDDING_MODEL_NAME") {
            self.embedding_model_name = val;
        }
        if let Ok(val) = env::var("HERMES_CHROMA_EMBEDDING_DIM") {
            self.chroma_embedding_dim = parse_env_u32("HERMES_CHROMA_EMBEDDING_DIM", &val)?;
        }
        if let Ok(val) = env::var("HERMES_CHROMA_DB_PATH") {
            self.chroma_db_path = val;
        }
        if let Ok(val) = env::var("HERMES_CHROMA_COLLECTION_NAME") {
            self.chroma_collection_name = val;
        }
        if let Ok(val) = env::var("HERMES_PROMOTION_SPECS") {
            self.promotion_specs = Some(val);
        }
        if let Ok(val) = env::var("HERMES_INPUT_SPREADSHEET_ID") {
            self.input_spreadsheet_id = Some(val);
        }
        if let Ok(val) = env::var("HERMES_OUTPUT_SPREADSHEET_ID") {
            self.output_spreadsheet_id = Some(val);
        }
        if let Ok(val) = env::var("HERMES_OUTPUT_SPREADSHEET_NAME") {
            self.output_spreadsheet_name = val;
        }
        if let Ok(val) = env::var("HERMES_PROCESSING_LIMIT") {
            self.hermes_processing_limit = parse_env_u32("HERMES_PROCESSING_LIMIT", &val)?;
        }

        Ok(())
    }
}

fn parse_env_u32(var_name: &str, val: &str) -> Result<u32, ConfigError> {
    val.parse::<u32>().map_err(|_| ConfigError::InvalidValue {
        field: var_name.to_string(),
        message: format!("'{val}' is not a valid u32"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn env_var_override_string() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("HERMES_LLM_PROVIDER", "anthropic");
        let mut config = Config::default();
        config.apply_env_overrides().expect("env override");
        assert_eq!(config.llm_provider, "anthropic");
        env::remove_var("HERMES_LLM_PROVIDER");
    }

    #[test]
    fn env_var_override_numeric() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("HERMES_CHROMA_EMBEDDING_DIM", "768");
        let mut config = Config::default();
        config.apply_env_overrides().expect("env override");
        assert_eq!(config.chroma_embedding_dim, 768);
        env::remove_var("HERMES_CHROMA_EMBEDDING_DIM");
    }

    #[test]
    fn env_var_invalid_numeric_returns_error() {
        let result = parse_env_u32("HERMES_CHROMA_EMBEDDING_DIM", "not_a_number");
        assert!(result.is_err());
        match result.unwrap_err() {
            ConfigError::InvalidValue { field, .. } => assert_eq!(field, "HERMES_CHROMA_EMBEDDING_DIM"),
            other => panic!("expected InvalidValue, got: {other}"),
        }
    }
}
