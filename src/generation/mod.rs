//! Recipe generation.
//!
//! Two text generators sit behind [`TextGenerator`]: Hugging Face inference for
//! `/analyze_or_generate` (cached, cross-checked by the parser) and Gemini for
//! `/llm_recipe` (falls back to a fixed recipe on any failure).

mod gemini;
mod generator;
mod huggingface;
mod merge;

pub use gemini::{fallback_recipe, generate_llm_recipe, GeminiClient};
pub use generator::{build_prompt, cache_key, RecipeGenerator, GEN_PROVIDER};
pub use huggingface::HuggingFaceClient;
pub use merge::{merge_ingredients, sanitize_ingredients, sanitize_steps};

use async_trait::async_trait;

use crate::errors::AppError;

/// Generation failures.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationError {
    /// The provider is not configured (missing credentials)
    NotConfigured(String),
    /// Empty query or similar caller mistake
    InvalidInput(String),
    /// Transport failure or non-success status from the provider
    Upstream(String),
    /// The provider replied with something that is not a usable recipe
    InvalidOutput(String),
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationError::NotConfigured(msg) => write!(f, "{}", msg),
            GenerationError::InvalidInput(msg) => write!(f, "{}", msg),
            GenerationError::Upstream(msg) => write!(f, "{}", msg),
            GenerationError::InvalidOutput(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for GenerationError {}

impl From<GenerationError> for AppError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::InvalidInput(msg) => AppError::Validation(msg),
            GenerationError::NotConfigured(msg) => {
                AppError::Internal(format!("Failed to generate recipe: {}", msg))
            }
            GenerationError::Upstream(msg) | GenerationError::InvalidOutput(msg) => {
                AppError::Upstream(format!("Failed to generate recipe: {}", msg))
            }
        }
    }
}

/// A model that turns a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model identifier, used in cache keys and responses.
    fn model(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Title case: first letter of every word upper, the rest lower.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_alpha = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("spicy VEGAN chili"), "Spicy Vegan Chili");
        assert_eq!(title_case("mac-n-cheese"), "Mac-N-Cheese");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_error_mapping() {
        let err: AppError = GenerationError::Upstream("boom".into()).into();
        assert_eq!(err.error_code(), "UPSTREAM_ERROR");
        let err: AppError = GenerationError::InvalidInput("empty".into()).into();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }
}
