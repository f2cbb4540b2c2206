//! Cached recipe generation cross-checked by the ingredient parser.

use std::sync::Arc;

use serde_json::Value;
use sha2::{Digest, Sha256};

use super::merge::{merge_ingredients, sanitize_ingredients, sanitize_steps};
use super::{GenerationError, TextGenerator};
use crate::db::{CacheEntry, Repository};
use crate::models::{Ingredient, RecipeMode, RecipePlan};
use crate::parser;

pub const GEN_PROVIDER: &str = "hf";
const SOURCE: &str = "generator+extractor";
const JSON_REMINDER: &str = "\nReturn VALID JSON only.";

/// Prompt asking for a recipe in the fixed JSON schema.
pub fn build_prompt(query: &str, servings: u32) -> String {
    format!(
        "You are a culinary assistant. Generate a recipe as JSON ONLY with the following schema: \
         {{\"title\": str, \"servings\": int, \"ingredients\": [{{\"name\": str, \"quantity\": number|null, \"unit\": str|null}}], \"steps\": [str, ...]}}. \
         Use concise ingredient names, realistic quantities for {servings} servings, prefer US customary units, \
         and avoid brand names. Respond with valid JSON and nothing else. Query: {query}",
        servings = servings,
        query = query.trim(),
    )
}

/// SHA-256 hex digest of `query|servings|provider|model`.
pub fn cache_key(query: &str, servings: u32, model: &str) -> String {
    let source = format!("{}|{}|{}|{}", query, servings, GEN_PROVIDER, model);
    hex::encode(Sha256::digest(source.as_bytes()))
}

/// Generates recipe plans for free-form requests.
#[derive(Clone)]
pub struct RecipeGenerator {
    llm: Option<Arc<dyn TextGenerator>>,
    repo: Option<Arc<Repository>>,
    default_servings: u32,
    cache_ttl_days: i64,
}

impl RecipeGenerator {
    pub fn new(
        llm: Option<Arc<dyn TextGenerator>>,
        repo: Option<Arc<Repository>>,
        default_servings: u32,
        cache_ttl_days: i64,
    ) -> Self {
        Self {
            llm,
            repo,
            default_servings: default_servings.max(1),
            cache_ttl_days,
        }
    }

    /// Generate (or fetch from cache) a recipe plan for `query`.
    ///
    /// `assumed` is echoed back as `servings_assumed`.
    pub async fn generate(
        &self,
        query: &str,
        servings: Option<u32>,
        assumed: bool,
    ) -> Result<RecipePlan, GenerationError> {
        if query.trim().is_empty() {
            return Err(GenerationError::InvalidInput(
                "Query text is required".to_string(),
            ));
        }
        let llm = self.llm.as_ref().ok_or_else(|| {
            GenerationError::NotConfigured("HF_API_TOKEN is required for generation".to_string())
        })?;
        let model = llm.model().to_string();
        let effective_servings = servings.filter(|s| *s > 0).unwrap_or(self.default_servings);

        let key_hash = cache_key(query, effective_servings, &model);
        if let Some(plan) = self.cached(&key_hash).await {
            tracing::debug!("Generator cache hit for {}", &key_hash[..12]);
            return Ok(plan);
        }

        let mut prompt = build_prompt(query, effective_servings);
        let raw = llm.complete(&prompt).await?;
        let candidate = match serde_json::from_str::<Value>(raw.trim()) {
            Ok(value) => value,
            Err(_) => {
                prompt.push_str(JSON_REMINDER);
                let retry = llm.complete(&prompt).await?;
                serde_json::from_str::<Value>(retry.trim()).map_err(|_| {
                    GenerationError::InvalidOutput(
                        "Generator returned non-JSON payload".to_string(),
                    )
                })?
            }
        };

        if !candidate.is_object() {
            return Err(GenerationError::InvalidOutput(
                "Generator payload must be a JSON object".to_string(),
            ));
        }

        let title = candidate
            .get("title")
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(query)
            .trim()
            .to_string();
        let plan_servings = servings_from(candidate.get("servings")).unwrap_or(effective_servings);
        let generated = sanitize_ingredients(candidate.get("ingredients").unwrap_or(&Value::Null));
        let steps = sanitize_steps(candidate.get("steps").unwrap_or(&Value::Null));

        let reparsed: Vec<Option<Ingredient>> = generated.iter().map(reparse).collect();
        let extras = if generated.is_empty() {
            parse_query(query)
        } else {
            Vec::new()
        };
        let ingredients = merge_ingredients(&generated, &reparsed, &extras);

        let plan = RecipePlan {
            mode: RecipeMode::Generate,
            title: Some(title),
            servings: plan_servings,
            servings_assumed: assumed,
            ingredients,
            steps,
            source: SOURCE.to_string(),
            model: Some(model.clone()),
            urgency: None,
            meal_time: None,
        };

        self.remember(&key_hash, query, plan_servings, &model, &plan)
            .await;
        Ok(plan)
    }

    async fn cached(&self, key_hash: &str) -> Option<RecipePlan> {
        let repo = self.repo.as_ref()?;
        match repo.cache_lookup(key_hash, self.cache_ttl_days).await {
            Ok(Some(value)) => serde_json::from_value(value).ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Generator cache lookup failed: {}", e);
                None
            }
        }
    }

    async fn remember(
        &self,
        key_hash: &str,
        query: &str,
        servings: u32,
        model: &str,
        plan: &RecipePlan,
    ) {
        let Some(repo) = &self.repo else {
            return;
        };
        let response_json = match serde_json::to_value(plan) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to serialize plan for cache: {}", e);
                return;
            }
        };
        let entry = CacheEntry {
            key_hash,
            query,
            servings,
            provider: GEN_PROVIDER,
            model,
            response_json: &response_json,
        };
        if let Err(e) = repo.cache_store(&entry).await {
            tracing::warn!("Generator cache store failed: {}", e);
        }
    }
}

/// Positive integer servings from a number or numeric string.
fn servings_from(value: Option<&Value>) -> Option<u32> {
    let servings = match value? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 1.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    u32::try_from(servings).ok().filter(|s| *s > 0)
}

/// Run one generated ingredient back through the parser as a bullet line.
fn reparse(item: &Ingredient) -> Option<Ingredient> {
    let line = bullet_line(item)?;
    parser::parse_ingredient_line(&line).map(Ingredient::from)
}

/// Ingredients named in the query itself, used when the generator listed none.
fn parse_query(query: &str) -> Vec<Ingredient> {
    parser::parse(query)
        .map(|parsed| parsed.ingredients.into_iter().map(Ingredient::from).collect())
        .unwrap_or_default()
}

fn bullet_line(item: &Ingredient) -> Option<String> {
    let quantity = item.quantity.map(|q| {
        if q.fract() == 0.0 {
            format!("{}", q as i64)
        } else {
            q.to_string()
        }
    });
    let parts: Vec<String> = [quantity, item.unit.clone(), item.name.clone()]
        .into_iter()
        .flatten()
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(format!("• {}", parts.join(" ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tempfile::TempDir;

    /// Replies with canned outputs in order, repeating the last one.
    struct ScriptedGenerator {
        replies: Mutex<Vec<Result<String, GenerationError>>>,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(replies: Vec<Result<String, GenerationError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        fn model(&self) -> &str {
            "test/model"
        }

        async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            let mut replies = self.replies.lock().unwrap();
            if replies.len() > 1 {
                replies.remove(0)
            } else {
                replies[0].clone()
            }
        }
    }

    const PASTA: &str = r#"{
        "title": "Garlic Pasta",
        "servings": 2,
        "ingredients": [
            {"name": "spaghetti", "quantity": 8, "unit": "oz"},
            {"name": "garlic", "quantity": "3", "unit": "clove"},
            {"name": "", "quantity": 1}
        ],
        "steps": ["Boil pasta", "Fry garlic", ""]
    }"#;

    async fn repo(dir: &TempDir) -> Arc<Repository> {
        let pool = crate::db::init_database(&dir.path().join("test.db"))
            .await
            .unwrap();
        Arc::new(Repository::new(pool))
    }

    #[test]
    fn test_cache_key_is_stable_sha256() {
        let key = cache_key("pasta", 2, "m");
        assert_eq!(key.len(), 64);
        assert_eq!(key, cache_key("pasta", 2, "m"));
        assert_ne!(key, cache_key("pasta", 3, "m"));
    }

    #[test]
    fn test_prompt_mentions_query_and_servings() {
        let prompt = build_prompt("  vegan chili ", 4);
        assert!(prompt.ends_with("Query: vegan chili"));
        assert!(prompt.contains("for 4 servings"));
        assert!(prompt.contains("\"steps\": [str, ...]"));
    }

    #[test]
    fn test_bullet_line_formatting() {
        let line = bullet_line(&Ingredient::new("flour", Some(2.0), Some("cup")));
        assert_eq!(line.as_deref(), Some("• 2 cup flour"));
        let line = bullet_line(&Ingredient::new("milk", Some(0.5), None));
        assert_eq!(line.as_deref(), Some("• 0.5 milk"));
        assert_eq!(bullet_line(&Ingredient::default()), None);
    }

    #[test]
    fn test_servings_from_value() {
        assert_eq!(servings_from(Some(&serde_json::json!(4))), Some(4));
        assert_eq!(servings_from(Some(&serde_json::json!("3"))), Some(3));
        assert_eq!(servings_from(Some(&serde_json::json!(0))), None);
        assert_eq!(servings_from(Some(&serde_json::json!("lots"))), None);
        assert_eq!(servings_from(None), None);
    }

    #[tokio::test]
    async fn test_generate_builds_plan() {
        let llm = ScriptedGenerator::new(vec![Ok(PASTA.to_string())]);
        let generator = RecipeGenerator::new(Some(llm.clone()), None, 1, 7);

        let plan = generator.generate("garlic pasta", None, true).await.unwrap();

        assert_eq!(plan.mode, RecipeMode::Generate);
        assert_eq!(plan.title.as_deref(), Some("Garlic Pasta"));
        assert_eq!(plan.servings, 2);
        assert!(plan.servings_assumed);
        assert_eq!(plan.source, "generator+extractor");
        assert_eq!(plan.model.as_deref(), Some("test/model"));
        assert_eq!(plan.steps, vec!["Boil pasta", "Fry garlic"]);
        let names: Vec<&str> = plan.ingredients.iter().map(Ingredient::name_or_empty).collect();
        assert_eq!(names, vec!["spaghetti", "garlic"]);
        assert_eq!(plan.ingredients[1].quantity, Some(3.0));
        assert!(llm.prompts.lock().unwrap()[0].contains("for 1 servings"));
    }

    #[tokio::test]
    async fn test_generate_does_not_duplicate_reparsed_ingredients() {
        let reply = r#"{
            "title": "Garlic Soup",
            "ingredients": [
                {"name": "onion", "quantity": 1, "unit": "medium"},
                {"name": "salt", "quantity": null, "unit": "to taste"},
                {"name": "garlic, minced", "quantity": 2, "unit": "clove"}
            ],
            "steps": ["Simmer"]
        }"#;
        let llm = ScriptedGenerator::new(vec![Ok(reply.to_string())]);
        let generator = RecipeGenerator::new(Some(llm), None, 1, 7);

        let plan = generator.generate("garlic soup", Some(2), false).await.unwrap();

        let names: Vec<&str> = plan.ingredients.iter().map(Ingredient::name_or_empty).collect();
        assert_eq!(names, vec!["onion", "salt", "garlic, minced"]);
        assert_eq!(plan.ingredients[0].quantity, Some(1.0));
        assert_eq!(plan.ingredients[0].unit.as_deref(), Some("medium"));
        assert_eq!(plan.ingredients[1].quantity, None);
        assert_eq!(plan.ingredients[2].quantity, Some(2.0));
    }

    #[tokio::test]
    async fn test_empty_generated_list_falls_back_to_query() {
        let reply = r#"{"title": "Stir Fry", "ingredients": [], "steps": []}"#;
        let llm = ScriptedGenerator::new(vec![Ok(reply.to_string())]);
        let generator = RecipeGenerator::new(Some(llm), None, 1, 7);

        let plan = generator
            .generate("stir fry with 2 cups rice", None, true)
            .await
            .unwrap();

        let names: Vec<&str> = plan.ingredients.iter().map(Ingredient::name_or_empty).collect();
        assert_eq!(names, vec!["rice"]);
    }

    #[tokio::test]
    async fn test_non_json_retries_once_with_reminder() {
        let llm = ScriptedGenerator::new(vec![
            Ok("Sure! Here is a recipe".to_string()),
            Ok(PASTA.to_string()),
        ]);
        let generator = RecipeGenerator::new(Some(llm.clone()), None, 1, 7);

        let plan = generator.generate("pasta", Some(2), false).await.unwrap();
        assert_eq!(plan.title.as_deref(), Some("Garlic Pasta"));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
        assert!(llm.prompts.lock().unwrap()[1].ends_with("Return VALID JSON only."));
    }

    #[tokio::test]
    async fn test_non_json_twice_fails() {
        let llm = ScriptedGenerator::new(vec![Ok("nope".to_string())]);
        let generator = RecipeGenerator::new(Some(llm), None, 1, 7);

        let err = generator.generate("pasta", None, true).await.unwrap_err();
        assert_eq!(
            err,
            GenerationError::InvalidOutput("Generator returned non-JSON payload".to_string())
        );
    }

    #[tokio::test]
    async fn test_array_payload_rejected() {
        let llm = ScriptedGenerator::new(vec![Ok("[1, 2]".to_string())]);
        let generator = RecipeGenerator::new(Some(llm), None, 1, 7);

        let err = generator.generate("pasta", None, true).await.unwrap_err();
        assert!(matches!(err, GenerationError::InvalidOutput(_)));
    }

    #[tokio::test]
    async fn test_missing_provider_and_empty_query() {
        let generator = RecipeGenerator::new(None, None, 1, 7);
        assert!(matches!(
            generator.generate("pasta", None, true).await,
            Err(GenerationError::NotConfigured(_))
        ));
        assert!(matches!(
            generator.generate("   ", None, true).await,
            Err(GenerationError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_second_request_served_from_cache() {
        let dir = TempDir::new().unwrap();
        let llm = ScriptedGenerator::new(vec![Ok(PASTA.to_string())]);
        let generator = RecipeGenerator::new(Some(llm.clone()), Some(repo(&dir).await), 1, 7);

        let first = generator.generate("garlic pasta", Some(2), false).await.unwrap();
        let second = generator.generate("garlic pasta", Some(2), false).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_upstream_errors_propagate() {
        let llm = ScriptedGenerator::new(vec![Err(GenerationError::Upstream("down".to_string()))]);
        let generator = RecipeGenerator::new(Some(llm), None, 1, 7);

        let err = generator.generate("pasta", None, true).await.unwrap_err();
        assert_eq!(err, GenerationError::Upstream("down".to_string()));
    }
}
