//! Error types for the Hermes core library.
//!
//! Each module has its own error enum to provide clear error boundaries.
//! The library uses `thiserror` for structured, typed errors.

/// Errors related to configuration loading, parsing, and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required configuration field is absent.
    #[error("missing required config field: {field}")]
    MissingField {
        /// The name of the missing field.
        field: String,
    },

    /// A configuration field has an unacceptable value.
    #[error("invalid value for config field '{field}': {message}")]
    InvalidValue {
        /// The name of the invalid field.
        field: String,
        /// A description of why the value is invalid.
        message: String,
    },

    /// The configuration file does not exist at the specified path.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// The path that was searched.
        path: String,
    },

    /// TOML deserialization failed.
    #[error("failed to parse config file: {source}")]
    ParseError {
        /// The underlying TOML parse error.
        #[source]
        source: toml::de::Error,
    },
}

/// Errors from loading or querying the product catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The catalog CSV file could not be read.
    #[error("failed to read catalog file '{path}': {source}")]
    Io {
        /// The path that failed to read.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A row in the catalog CSV failed to parse.
    #[error("malformed catalog row {row}: {message}")]
    MalformedRow {
        /// The 1-indexed row number (header excluded).
        row: usize,
        /// Description of what was wrong with the row.
        message: String,
    },

    /// The catalog CSV is missing a required column.
    #[error("catalog file missing required column: {column}")]
    MissingColumn {
        /// The name of the missing column.
        column: String,
    },

    /// Two catalog rows declared the same product id.
    #[error("duplicate product id in catalog: {product_id}")]
    DuplicateProductId {
        /// The duplicated product id.
        product_id: String,
    },
}

/// Errors from interacting with LLM providers.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// HTTP request to the LLM endpoint failed.
    #[error("LLM HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// LLM API returned an error response.
    #[error("LLM API error (status {status}): {message}")]
    Api {
        /// The HTTP status code.
        status: u16,
        /// The error message from the API.
        message: String,
    },

    /// LLM provider rate limit hit.
    #[error("LLM rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// LLM response could not be parsed as text.
    #[error("failed to parse LLM response: {0}")]
    Parse(String),

    /// No LLM provider configured.
    #[error("no LLM provider configured")]
    NotConfigured,

    /// The response did not validate against the expected structured-output schema.
    #[error("structured output failed schema validation: {message}")]
    StructuredOutputValidation {
        /// Description of which fields failed validation.
        message: String,
        /// Field paths that were missing or malformed.
        missing_fields: Vec<String>,
    },

    /// A tool the caller required was not invoked by the model.
    #[error("required tool(s) not called: {0:?}")]
    MissingTools(Vec<String>),
}

/// Terminal error for a node after the structured-output retry loop is exhausted.
///
/// See spec §4.2/§7: raised once `max_retries` is spent; carries enough
/// detail for the graph supervisor to record an `ErrorRecord`.
#[derive(Debug, thiserror::Error)]
#[error("tool call error after {attempts} attempt(s): missing {missing_tools:?}: {source}")]
pub struct ToolCallError {
    /// Number of attempts made before giving up (including the first).
    pub attempts: u32,
    /// Tools or required fields that were never satisfied.
    pub missing_tools: Vec<String>,
    /// The last underlying LLM error.
    #[source]
    pub source: LlmError,
}

/// Errors from the product resolver (stockkeeper).
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    /// The vector index could not be queried.
    #[error("vector index query failed: {0}")]
    VectorIndex(String),

    /// A mention carried no usable identifying information.
    #[error("mention has no id, name, description, or type")]
    EmptyMention,
}

/// Errors surfaced by the graph runner.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// A node the graph depends on never ran and left no error record either
    /// (an invariant violation in the driver itself, not a node failure).
    #[error("node '{node}' produced neither an output slot nor an error record")]
    MissingSlot {
        /// The node name.
        node: String,
    },
}

/// Errors from reading or writing batch driver I/O (catalog/email sources, result CSVs/YAML).
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Generic I/O failure with contextual path information.
    #[error("I/O error at '{path}': {source}")]
    Path {
        /// The path being read or written.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// CSV (de)serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// YAML (de)serialization failed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_missing_field_message() {
        let err = ConfigError::MissingField {
            field: "llm_provider".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "missing required config field: llm_provider"
        );
    }

    #[test]
    fn config_error_invalid_value_message() {
        let err = ConfigError::InvalidValue {
            field: "llm_provider".to_string(),
            message: "must be openai or google".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid value for config field 'llm_provider': must be openai or google"
        );
    }

    #[test]
    fn catalog_error_duplicate_product_id_message() {
        let err = CatalogError::DuplicateProductId {
            product_id: "LTH0976".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "duplicate product id in catalog: LTH0976"
        );
    }

    #[test]
    fn catalog_error_missing_column_message() {
        let err = CatalogError::MissingColumn {
            column: "stock".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "catalog file missing required column: stock"
        );
    }

    #[test]
    fn llm_error_not_configured_message() {
        let err = LlmError::NotConfigured;
        assert_eq!(err.to_string(), "no LLM provider configured");
    }

    #[test]
    fn llm_error_missing_tools_message() {
        let err = LlmError::MissingTools(vec!["lookup_product".to_string()]);
        assert_eq!(
            err.to_string(),
            "required tool(s) not called: [\"lookup_product\"]"
        );
    }

    #[test]
    fn tool_call_error_message() {
        let err = ToolCallError {
            attempts: 3,
            missing_tools: vec!["lookup_product".to_string()],
            source: LlmError::NotConfigured,
        };
        assert_eq!(
            err.to_string(),
            "tool call error after 3 attempt(s): missing [\"lookup_product\"]: no LLM provider configured"
        );
    }

    #[test]
    fn resolver_error_empty_mention_message() {
        let err = ResolverError::EmptyMention;
        assert_eq!(
            err.to_string(),
            "mention has no id, name, description, or type"
        );
    }
}
