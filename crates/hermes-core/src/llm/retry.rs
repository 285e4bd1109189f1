//! Structured-output retry loop (spec §4.2).
//!
//! Wraps an [`LlmProvider`] call with: render prompt → parse response against
//! an expected schema → on failure, render retry guidance naming exactly what
//! was missing and try again, up to `max_retries` times → terminal
//! [`ToolCallError`] once attempts are exhausted.

use super::{GenerationParams, LlmProvider, LlmResponse, ToolSpec};
use crate::error::{LlmError, ToolCallError};
use serde::de::DeserializeOwned;

/// Configuration for the retry loop. Defaults mirror spec §4.2 ("retry twice
/// by default before giving up").
#[derive(Debug, Clone)]
pub struct RetryLoopConfig {
    /// Maximum number of retry attempts after the first call.
    pub max_retries: u32,
    /// Generation parameters applied to every attempt.
    pub params: GenerationParams,
}

impl Default for RetryLoopConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            params: GenerationParams::default(),
        }
    }
}

/// Outcome of a single structured-output attempt (spec §9: "dynamic dispatch
/// on LLM response shape" — a provider's reply can parse cleanly, arrive as
/// unparseable raw text, or fail outright).
pub enum LlmResult<T> {
    /// The response parsed into `T` and satisfied any required tools.
    Parsed(T),
    /// The response text could not be matched to the expected shape.
    Raw(String),
    /// The underlying LLM call itself failed (network, auth, rate limit).
    Err(LlmError),
}

/// Run the structured-output retry loop against `provider`.
///
/// `input_data` is interpolated into the prompt template (as JSON, if it
/// implements `Serialize`'s sibling concerns are handled by the caller — here
/// it is already a rendered string). `expected_tools`, when non-empty, are
/// required: attempts whose response doesn't report invoking all of them
/// count as failures needing retry guidance, same as a schema mismatch.
pub async fn generate_structured<T: DeserializeOwned>(
    provider: &dyn LlmProvider,
    system_prompt: &str,
    base_prompt: &str,
    tools: Option<Vec<ToolSpec>>,
    required_tools: &[String],
    config: &RetryLoopConfig,
) -> Result<T, ToolCallError> {
    let mut last_error = LlmError::NotConfigured;
    let mut missing = Vec::new();
    let mut prompt = base_prompt.to_string();

    for attempt in 0..=config.max_retries {
        let params = GenerationParams {
            tools: tools.clone(),
            ..config.params.clone()
        };

        let response = match provider.complete(system_prompt, &prompt, &params).await {
            Ok(resp) => resp,
            Err(e) => {
                last_error = e;
                missing = required_tools.to_vec();
                prompt = render_retry_prompt(base_prompt, &missing, &[]);
                continue;
            }
        };

        let missing_tools = missing_required_tools(&response, required_tools);

        match serde_json::from_str::<T>(&response.text) {
            Ok(value) if missing_tools.is_empty() => return Ok(value),
            Ok(_) => {
                last_error = LlmError::MissingTools(missing_tools.clone());
                missing = missing_tools;
            }
            Err(parse_err) => {
                let fields = extract_missing_fields(&parse_err);
                missing = if fields.is_empty() {
                    missing_tools
                } else {
                    fields
                };
                last_error = LlmError::StructuredOutputValidation {
                    message: parse_err.to_string(),
                    missing_fields: missing.clone(),
                };
            }
        }

        tracing::warn!(
            attempt = attempt + 1,
            max_retries = config.max_retries,
            missing = ?missing,
            "structured output attempt failed, retrying",
        );

        prompt = render_retry_prompt(base_prompt, &missing, &response.tool_calls);
    }

    Err(ToolCallError {
        attempts: config.max_retries + 1,
        missing_tools: missing,
        source: last_error,
    })
}

/// Classify a raw completion for the `LlmResult` sum type without consuming
/// it destructively. Exposed for callers that want the shape before
/// committing to strict deserialization (spec §9 open question on dynamic
/// dispatch).
pub fn classify<T: DeserializeOwned>(response: &LlmResponse, required_tools: &[String]) -> LlmResult<T> {
    if !missing_required_tools(response, required_tools).is_empty() {
        return LlmResult::Raw(response.text.clone());
    }
    match serde_json::from_str::<T>(&response.text) {
        Ok(value) => LlmResult::Parsed(value),
        Err(_) => LlmResult::Raw(response.text.clone()),
    }
}

fn missing_required_tools(response: &LlmResponse, required_tools: &[String]) -> Vec<String> {
    required_tools
        .iter()
        .filter(|t| !response.tool_calls.iter().any(|called| called == *t))
        .cloned()
        .collect()
}

/// Extract the field names serde's error message names as missing, via the
/// `missing field \`name\`` pattern serde_json emits. Falls back to an
/// empty vec (generic "response malformed" guidance) when the message
/// doesn't match that shape.
fn extract_missing_fields(err: &serde_json::Error) -> Vec<String> {
    let message = err.to_string();
    let mut fields = Vec::new();
    let mut rest = message.as_str();
    while let Some(start) = rest.find("missing field `") {
        let after = &rest[start + "missing field `".len()..];
        if let Some(end) = after.find('`') {
            fields.push(after[..end].to_string());
            rest = &after[end + 1..];
        } else {
            break;
        }
    }
    fields
}

/// Render the guidance appended to the original prompt on retry, naming
/// exactly what the previous attempt failed to provide (spec §4.2: retry
/// guidance is parameterized by what's missing, not baked in up front).
fn render_retry_prompt(base_prompt: &str, missing: &[String], tool_calls: &[String]) -> String {
    if missing.is_empty() {
        return base_prompt.to_string();
    }
    let mut guidance = format!(
        "\n\nYour previous response did not satisfy all requirements. \
         The following were missing or invalid: {}.",
        missing.join(", ")
    );
    if !tool_calls.is_empty() {
        guidance.push_str(&format!(" Tools invoked last time: {}.", tool_calls.join(", ")));
    }
    guidance.push_str(" Please provide a complete, valid response addressing all of the above.");
    format!("{base_prompt}{guidance}")
}


impl<T: std::fmt::Debug> std::fmt::Debug for LlmResult<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmResult::Parsed(v) => write!(f, "Parsed({v:?})"),
            LlmResult::Raw(s) => write!(f, "Raw({s:?})"),
            LlmResult::Err(e) => write!(f, "Err({e:?})"),
        }
    }
}
