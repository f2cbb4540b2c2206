//! Gemini provider for `/llm_recipe`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::merge::{sanitize_ingredients, sanitize_steps};
use super::{title_case, GenerationError, TextGenerator};
use crate::config::GeminiConfig;
use crate::models::{GeneratedRecipe, Ingredient};

const GEMINI_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    /// Returns `None` when no API key is configured.
    pub fn from_config(config: &GeminiConfig) -> Option<Self> {
        let api_key = config.api_key.clone()?;
        let client = reqwest::Client::builder()
            .timeout(GEMINI_TIMEOUT)
            .build()
            .unwrap_or_default();
        Some(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part {
                        text: Some("You return only valid JSON.".to_string()),
                    },
                    Part {
                        text: Some(prompt.to_string()),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                max_output_tokens: 600,
            },
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Upstream(format!(
                "Gemini returned {}",
                status.as_u16()
            )));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidOutput(e.to_string()))?;

        body.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| GenerationError::InvalidOutput("Gemini response missing parts".to_string()))
    }
}

fn build_prompt(query: &str, servings: u32) -> String {
    format!(
        "You are an expert chef. Generate a recipe in strict JSON format with keys: \
         title (string), servings (int), ingredients (array of {{name, quantity, unit}}), \
         steps (array of strings). The recipe should satisfy the request: \
         '{}' for {} servings. JSON only, no prose.",
        query, servings
    )
}

/// Recipe returned whenever Gemini is unavailable or replies with garbage.
pub fn fallback_recipe(query: &str, servings: u32) -> GeneratedRecipe {
    let title = if query.trim().is_empty() {
        "Chef's Choice".to_string()
    } else {
        title_case(query.trim())
    };
    GeneratedRecipe {
        title,
        servings,
        ingredients: vec![
            Ingredient::new("seasonal vegetables", Some(2.0), Some("cups")),
            Ingredient::new("olive oil", Some(2.0), Some("tbsp")),
            Ingredient::new("salt", Some(1.0), Some("tsp")),
        ],
        steps: vec![
            "Heat olive oil in a skillet.".to_string(),
            "Add vegetables and sauté until tender.".to_string(),
            "Season with salt and serve warm.".to_string(),
        ],
    }
}

/// Generate a recipe with `llm`, falling back to [`fallback_recipe`] when no
/// generator is configured or anything goes wrong.
pub async fn generate_llm_recipe(
    llm: Option<&dyn TextGenerator>,
    query: &str,
    servings: u32,
) -> GeneratedRecipe {
    let Some(llm) = llm else {
        return fallback_recipe(query, servings);
    };

    match llm.complete(&build_prompt(query, servings)).await {
        Ok(text) => match recipe_from_text(&text, query, servings) {
            Some(recipe) => recipe,
            None => {
                tracing::warn!("Recipe generator returned an unusable payload, using fallback");
                fallback_recipe(query, servings)
            }
        },
        Err(e) => {
            tracing::warn!("Recipe generation failed, using fallback: {}", e);
            fallback_recipe(query, servings)
        }
    }
}

fn recipe_from_text(text: &str, query: &str, servings: u32) -> Option<GeneratedRecipe> {
    let value: Value = serde_json::from_str(strip_code_fence(text)).ok()?;
    let object = value.as_object()?;
    let ingredients = sanitize_ingredients(object.get("ingredients")?);
    if ingredients.is_empty() {
        return None;
    }

    let title = object
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| title_case(query.trim()));
    let servings = object
        .get("servings")
        .and_then(Value::as_u64)
        .and_then(|s| u32::try_from(s).ok())
        .filter(|s| *s > 0)
        .unwrap_or(servings);
    let steps = sanitize_steps(object.get("steps").unwrap_or(&Value::Null));

    Some(GeneratedRecipe {
        title,
        servings,
        ingredients,
        steps,
    })
}

/// Gemini likes to wrap JSON in ```json fences.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GeminiClient {
        GeminiClient::from_config(&GeminiConfig {
            api_key: Some("g-key".to_string()),
            base_url: server.uri(),
            model: "gemini-pro".to_string(),
        })
        .unwrap()
    }

    fn reply(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": text}]}}]
        }))
    }

    #[test]
    fn test_fallback_recipe() {
        let recipe = fallback_recipe("  spicy tofu bowl ", 3);
        assert_eq!(recipe.title, "Spicy Tofu Bowl");
        assert_eq!(recipe.servings, 3);
        assert_eq!(recipe.ingredients.len(), 3);
        assert_eq!(recipe.steps.len(), 3);
        assert_eq!(fallback_recipe("", 1).title, "Chef's Choice");
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence(" {\"a\":1} "), "{\"a\":1}");
    }

    #[tokio::test]
    async fn test_no_key_uses_fallback() {
        let recipe = generate_llm_recipe(None, "lentil soup", 2).await;
        assert_eq!(recipe, fallback_recipe("lentil soup", 2));
    }

    #[tokio::test]
    async fn test_gemini_recipe_is_used() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-pro:generateContent"))
            .and(query_param("key", "g-key"))
            .respond_with(reply(
                r#"{"title": "Lentil Soup", "ingredients": [{"name": "lentils", "quantity": 1, "unit": "cup"}], "steps": ["Simmer"]}"#,
            ))
            .mount(&server)
            .await;

        let gemini = client(&server);
        let recipe = generate_llm_recipe(Some(&gemini), "lentil soup", 4).await;

        assert_eq!(recipe.title, "Lentil Soup");
        assert_eq!(recipe.servings, 4);
        assert_eq!(
            recipe.ingredients,
            vec![Ingredient::new("lentils", Some(1.0), Some("cup"))]
        );
        assert_eq!(recipe.steps, vec!["Simmer"]);
    }

    #[tokio::test]
    async fn test_bad_replies_fall_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(reply("I cannot help with that"))
            .mount(&server)
            .await;
        let gemini = client(&server);
        assert_eq!(
            generate_llm_recipe(Some(&gemini), "stew", 2).await,
            fallback_recipe("stew", 2)
        );

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let gemini = client(&server);
        assert_eq!(
            generate_llm_recipe(Some(&gemini), "stew", 2).await,
            fallback_recipe("stew", 2)
        );
    }
}
