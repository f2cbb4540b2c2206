//! Hugging Face inference API provider.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::{GenerationError, TextGenerator};
use crate::config::GeneratorConfig;

const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

#[derive(Debug, Serialize)]
struct InferenceParameters {
    max_new_tokens: u32,
    temperature: f32,
    return_full_text: bool,
}

/// Text generation through `POST {base}/models/{model}`.
#[derive(Debug, Clone)]
pub struct HuggingFaceClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    max_retries: u32,
    backoff: Duration,
}

impl HuggingFaceClient {
    /// Build a client from config. Returns `None` without an API token.
    pub fn from_config(config: &GeneratorConfig) -> Option<Self> {
        let token = config.hf_api_token.clone()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs_f64(config.request_timeout_secs))
            .build()
            .unwrap_or_default();

        Some(Self {
            client,
            token,
            base_url: config.hf_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            max_retries: config.max_retries,
            backoff: Duration::from_millis(500),
        })
    }

    /// Override the initial retry delay (doubles on every attempt).
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}", self.base_url, self.model)
    }
}

#[async_trait]
impl TextGenerator for HuggingFaceClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = InferenceRequest {
            inputs: prompt,
            parameters: InferenceParameters {
                max_new_tokens: self.max_tokens,
                temperature: self.temperature,
                return_full_text: false,
            },
        };
        let url = self.endpoint();

        let mut attempt = 0;
        let response = loop {
            let delay = self.backoff * 2u32.saturating_pow(attempt);
            let result = self
                .client
                .post(&url)
                .bearer_auth(&self.token)
                .json(&request)
                .send()
                .await;

            match result {
                Ok(response)
                    if RETRY_STATUSES.contains(&response.status().as_u16())
                        && attempt < self.max_retries =>
                {
                    tracing::warn!(
                        "Inference returned {}, retrying (attempt {})",
                        response.status(),
                        attempt + 1
                    );
                }
                Ok(response) => break response,
                Err(e) if attempt < self.max_retries => {
                    tracing::warn!("Inference request failed: {}, retrying", e);
                }
                Err(e) => {
                    return Err(GenerationError::Upstream(format!(
                        "HF inference request failed: {}",
                        e
                    )))
                }
            }
            tokio::time::sleep(delay).await;
            attempt += 1;
        };

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Upstream(e.to_string()))?;

        if !status.is_success() {
            let snippet: String = body.chars().take(200).collect();
            return Err(GenerationError::Upstream(format!(
                "HF inference failed ({}): {}",
                status.as_u16(),
                snippet
            )));
        }

        let payload: Value = serde_json::from_str(&body).unwrap_or(Value::String(body));
        extract_generated_text(&payload).ok_or_else(|| {
            GenerationError::InvalidOutput("HF inference returned unexpected payload".to_string())
        })
    }
}

/// Accepts `[{"generated_text": ..}]`, `{"generated_text": ..}` or a bare string.
fn extract_generated_text(payload: &Value) -> Option<String> {
    match payload {
        Value::Array(items) => match items.first()? {
            Value::String(s) => Some(s.clone()),
            first => first.get("generated_text")?.as_str().map(str::to_string),
        },
        Value::Object(_) => payload
            .get("generated_text")?
            .as_str()
            .map(str::to_string),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}
