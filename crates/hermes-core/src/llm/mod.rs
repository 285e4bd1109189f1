//! LLM provider abstraction and implementations.
//!
//! Provides a trait-based abstraction for LLM providers (a general
//! OpenAI-compatible family, a Google/Gemini family, and native Anthropic)
//! with typed responses, token usage tracking, and health checking. The
//! structured-output retry loop that sits above this contract lives in
//! [`retry`] (spec §4.2).

pub mod anthropic;
pub mod factory;
pub mod gemini;
pub mod openai_compat;
pub mod retry;

use crate::error::LlmError;

/// Token usage information from an LLM completion.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TokenUsage {
    /// Number of tokens in the input/prompt.
    pub input_tokens: u32,
    /// Number of tokens in the output/completion.
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Accumulate token counts from another usage record (e.g. across retries).
    pub fn accumulate(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Response from an LLM completion request.
#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    /// The generated text content (expected to be a JSON document when the
    /// caller requested structured output).
    pub text: String,
    /// Token usage for this completion.
    pub usage: TokenUsage,
    /// The model that produced this response.
    pub model: String,
    /// Names of tools the model reported invoking, if any (spec §9:
    /// "a typed implementation should surface, on each LLM call, the set
    /// of tools actually invoked"). Populated from a `tool_calls` array
    /// embedded in the structured response when present.
    pub tool_calls: Vec<String>,
}

/// A tool the model may call while producing structured output (spec §4.2,
/// §6 "LLM client contract").
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
}

/// Parameters controlling LLM generation behavior.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    /// Maximum number of tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 = deterministic, 1.0+ = creative).
    pub temperature: f32,
    /// Optional system prompt override. If `Some`, replaces the caller's system prompt.
    pub system_prompt: Option<String>,
    /// Tools bound to this call, if any (spec §4.2 "optional tool set").
    pub tools: Option<Vec<ToolSpec>>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.7,
            system_prompt: None,
            tools: None,
        }
    }
}

/// Extract a `tool_calls` array of strings embedded in a structured-output
/// JSON response, if present. Providers call this after receiving the raw
/// completion text so [`LlmResponse::tool_calls`] reflects what the model
/// actually reported invoking (spec §9).
pub fn extract_tool_calls(text: &str) -> Vec<String> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else {
        return Vec::new();
    };
    value
        .get("tool_calls")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

/// Trait abstracting all LLM provider operations.
///
/// Implementations include `OpenAiCompatProvider` (for OpenAI and Ollama)
/// and `AnthropicProvider`. The trait is object-safe for use as `Box<dyn LlmProvider>`.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the display name of this provider (e.g., "openai", "anthropic", "ollama").
    fn name(&self) -> &str;

    /// Send a completion request to the LLM.
    ///
    /// If `params.system_prompt` is `Some`, it overrides the `system` parameter.
    async fn complete(
        &self,
        system: &str,
        user_message: &str,
        params: &GenerationParams,
    ) -> Result<LlmResponse, LlmError>;

    /// Check if the provider is reachable and configured correctly.
    async fn health_check(&self) -> Result<(), LlmError>;
}
