//! Provider factory for creating LLM providers from configuration.
//!
//! Reads [`Config`] and returns the correct provider instance, abstracting
//! away provider-specific construction details. Node implementations pick
//! between the strong and weak model names via `ModelTier` rather than the
//! factory itself, since the provider family is shared across both.

use super::anthropic::AnthropicProvider;
use super::gemini::GeminiProvider;
use super::openai_compat::OpenAiCompatProvider;
use super::LlmProvider;
use crate::config::Config;
use crate::error::LlmError;

/// Which model tier a node should request (spec §6: `llm_strong_model_name`
/// for the higher-capability calls, `llm_weak_model_name` for cheaper ones).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    /// Classifier and Fulfiller use the strong model.
    Strong,
    /// Advisor and Composer use the weak model.
    Weak,
}

/// Create an LLM provider from configuration for the given model tier.
///
/// Returns `Box<dyn LlmProvider>` so callers are decoupled from the concrete type.
/// Logs the constructed provider at info level (without the API key).
pub fn create_provider(config: &Config, tier: ModelTier) -> Result<Box<dyn LlmProvider>, LlmError> {
    let model = match tier {
        ModelTier::Strong => config.llm_strong_model_name.clone(),
        ModelTier::Weak => config.llm_weak_model_name.clone(),
    };

    match config.llm_provider.as_str() {
        "openai" => {
            let api_key = config
                .llm_api_key
                .as_deref()
                .filter(|k| !k.is_empty())
                .ok_or(LlmError::NotConfigured)?
                .to_string();

            let base_url = config
                .llm_provider_url
                .as_deref()
                .filter(|u| !u.is_empty())
                .unwrap_or("https://api.openai.com/v1")
                .to_string();

            tracing::info!(provider = "openai", model = %model, base_url = %base_url, "Creating LLM provider");

            Ok(Box::new(OpenAiCompatProvider::new(
                base_url,
                api_key,
                model,
                "openai".to_string(),
            )))
        }
        "ollama" => {
            let base_url = config
                .llm_provider_url
                .as_deref()
                .filter(|u| !u.is_empty())
                .unwrap_or("http://localhost:11434/v1")
                .to_string();

            tracing::info!(provider = "ollama", model = %model, base_url = %base_url, "Creating LLM provider");

            Ok(Box::new(OpenAiCompatProvider::new(
                base_url,
                "ollama".to_string(),
                model,
                "ollama".to_string(),
            )))
        }
        "anthropic" => {
            let api_key = config
                .llm_api_key
                .as_deref()
                .filter(|k| !k.is_empty())
                .ok_or(LlmError::NotConfigured)?
                .to_string();

            tracing::info!(provider = "anthropic", model = %model, "Creating LLM provider");

            if let Some(base_url) = config.llm_provider_url.as_deref().filter(|u| !u.is_empty()) {
                Ok(Box::new(AnthropicProvider::with_base_url(
                    api_key,
                    model,
                    base_url.to_string(),
                )))
            } else {
                Ok(Box::new(AnthropicProvider::new(api_key, model)))
            }
        }
        "google" => {
            let api_key = config
                .llm_api_key
                .as_deref()
                .filter(|k| !k.is_empty())
                .ok_or(LlmError::NotConfigured)?
                .to_string();

            tracing::info!(provider = "google", model = %model, "Creating LLM provider");

            if let Some(base_url) = config.llm_provider_url.as_deref().filter(|u| !u.is_empty()) {
                Ok(Box::new(GeminiProvider::with_base_url(
                    api_key,
                    model,
                    base_url.to_string(),
                )))
            } else {
                Ok(Box::new(GeminiProvider::new(api_key, model)))
            }
        }
        _other => Err(LlmError::NotConfigured),
    }
}
