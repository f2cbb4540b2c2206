//! Typed HTTP client for the BananaKart API.
//!
//! One request per call: no retries, no idempotency keys. Non-success replies
//! surface the raw response body in [`ClientError::Http`].

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::API_KEY_HEADER;
use crate::feed::Dashboard;
use crate::models::{
    AnalyzeRequest, AnalyzeResponse, AutoRequest, CartItem, CartSnapshot, EcoResultRow,
    GeneratedRecipe, LlmRecipeRequest, LlmRecipeResponse, LlmResponseType, Order, RecipePlan,
    SimulationRequest, SimulationResult, SourcingPlan, StoredRecipe, Urgency,
};

pub const BACKEND_URL_VAR: &str = "BACKEND_URL";
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";

/// Client-side failures.
#[derive(Debug)]
pub enum ClientError {
    /// Rejected locally; nothing was sent
    Validation(String),
    /// The backend answered with a non-success status
    Http { status: u16, body: String },
    /// Connection, timeout or other transport failure
    Transport(String),
    /// The reply was not the expected JSON
    Decode(String),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Validation(msg) => write!(f, "{}", msg),
            ClientError::Http { status, body } => write!(f, "HTTP {}: {}", status, body),
            ClientError::Transport(msg) => write!(f, "Request failed: {}", msg),
            ClientError::Decode(msg) => write!(f, "Unexpected response: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

/// Result of `/llm_recipe` as the caller should see it.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmRecipeOutcome {
    /// The backend needs a ZIP code; show `message` instead of a recipe
    NeedZip { message: String },
    Ready {
        message: String,
        recipe: GeneratedRecipe,
        sourcing: SourcingPlan,
    },
}

#[derive(Debug, Clone)]
pub struct BananaKartClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl BananaKartClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
        }
    }

    /// Base URL from `BACKEND_URL`, defaulting to a local server.
    pub fn from_env() -> Self {
        let base_url = std::env::var(BACKEND_URL_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        Self::new(base_url)
    }

    /// Send `x-api-key` with every request.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit a recipe for analysis. Empty text is rejected before any request.
    pub async fn analyze(
        &self,
        user_id: Uuid,
        recipe_text: &str,
        urgency: Urgency,
    ) -> Result<AnalyzeResponse, ClientError> {
        if recipe_text.trim().is_empty() {
            return Err(ClientError::Validation(
                "Recipe text cannot be empty".to_string(),
            ));
        }
        let body = AnalyzeRequest {
            user_id,
            recipe_text: recipe_text.to_string(),
            urgency,
        };
        self.post(&["analyze"], &body).await
    }

    pub async fn simulate(&self, recipe_id: Uuid) -> Result<SimulationResult, ClientError> {
        self.post(&["simulate"], &SimulationRequest { recipe_id }).await
    }

    pub async fn analyze_or_generate(
        &self,
        text: &str,
        servings: Option<u32>,
    ) -> Result<RecipePlan, ClientError> {
        let body = AutoRequest {
            text: text.to_string(),
            servings,
        };
        self.post(&["analyze_or_generate"], &body).await
    }

    pub async fn llm_recipe(
        &self,
        text: &str,
        servings: Option<u32>,
        zipcode: Option<&str>,
    ) -> Result<LlmRecipeOutcome, ClientError> {
        let body = LlmRecipeRequest {
            text: text.to_string(),
            servings,
            zipcode: zipcode.map(str::to_string),
        };
        let response: LlmRecipeResponse = self.post(&["llm_recipe"], &body).await?;

        match response.response_type {
            LlmResponseType::NeedZip => Ok(LlmRecipeOutcome::NeedZip {
                message: response.message,
            }),
            LlmResponseType::Ok => match (response.recipe, response.sourcing) {
                (Some(recipe), Some(sourcing)) => Ok(LlmRecipeOutcome::Ready {
                    message: response.message,
                    recipe,
                    sourcing,
                }),
                _ => Err(ClientError::Decode(
                    "ok response without recipe or sourcing".to_string(),
                )),
            },
        }
    }

    pub async fn recipe(&self, id: Uuid) -> Result<StoredRecipe, ClientError> {
        self.get(&["api", "recipes", &id.to_string()]).await
    }

    /// Latest stored eco result, or `None` when the recipe has none yet.
    pub async fn latest_eco_result(
        &self,
        recipe_id: Uuid,
    ) -> Result<Option<EcoResultRow>, ClientError> {
        match self.get(&["api", "eco_results", &recipe_id.to_string()]).await {
            Ok(row) => Ok(Some(row)),
            Err(ClientError::Http { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// A dashboard seeded with the latest stored result.
    pub async fn dashboard(&self, recipe_id: Uuid) -> Result<Dashboard, ClientError> {
        Ok(match self.latest_eco_result(recipe_id).await? {
            Some(row) => Dashboard::with_initial(recipe_id, row.result),
            None => Dashboard::new(recipe_id),
        })
    }

    /// WebSocket URL of the change feed for `recipe_id`.
    pub fn eco_results_ws_url(&self, recipe_id: Uuid) -> String {
        let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            self.base_url.clone()
        };
        format!("{}/ws/eco_results?recipe_id={}", ws_base, recipe_id)
    }

    pub async fn cart(&self, session: &str) -> Result<CartSnapshot, ClientError> {
        self.get(&["api", "carts", session]).await
    }

    pub async fn add_to_cart(
        &self,
        session: &str,
        item: &CartItem,
    ) -> Result<CartSnapshot, ClientError> {
        self.post(&["api", "carts", session, "items"], item).await
    }

    pub async fn checkout(&self, session: &str) -> Result<Order, ClientError> {
        self.post(&["api", "carts", session, "checkout"], &serde_json::json!({}))
            .await
    }

    /// Base URL with `segments` appended, each percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let invalid = || ClientError::Validation(format!("Invalid backend URL: {}", self.base_url));
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ClientError> {
        let request = self.http.get(self.url(segments)?);
        self.send(request).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ClientError> {
        let request = self.http.post(self.url(segments)?).json(body);
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        mut request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::Http {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_empty_analyze_never_hits_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let client = BananaKartClient::new(server.uri());
        let err = client
            .analyze(Uuid::new_v4(), "   \n", Urgency::Tonight)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[tokio::test]
    async fn test_need_zip_outcome() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/llm_recipe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response_type": "need_zip",
                "message": "Please provide your ZIP code so I can locate nearby farmers markets.",
                "recipe": null,
                "sourcing": null
            })))
            .mount(&server)
            .await;

        let client = BananaKartClient::new(server.uri());
        let outcome = client.llm_recipe("veggie chili", None, None).await.unwrap();
        assert_eq!(
            outcome,
            LlmRecipeOutcome::NeedZip {
                message: "Please provide your ZIP code so I can locate nearby farmers markets."
                    .to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_http_errors_keep_the_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/simulate"))
            .respond_with(ResponseTemplate::new(404).set_body_string("recipe missing"))
            .mount(&server)
            .await;

        let client = BananaKartClient::new(server.uri());
        let err = client.simulate(Uuid::new_v4()).await.unwrap_err();
        match err {
            ClientError::Http { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "recipe missing");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_decode_errors_are_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = BananaKartClient::new(server.uri());
        let err = client
            .analyze(Uuid::new_v4(), "2 eggs", Urgency::Soon)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[tokio::test]
    async fn test_api_key_and_body_are_sent() {
        let server = MockServer::start().await;
        let recipe_id = Uuid::new_v4();
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .and(header("x-api-key", "secret"))
            .and(body_partial_json(json!({"recipe_text": "2 eggs", "urgency": "later"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "recipe_id": recipe_id,
                "ingredients": ["eggs"],
                "message": "Recipe analyzed and stored."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = BananaKartClient::new(format!("{}/", server.uri())).with_api_key("secret");
        let response = client
            .analyze(Uuid::new_v4(), "2 eggs", Urgency::Later)
            .await
            .unwrap();
        assert_eq!(response.recipe_id, recipe_id);
        assert_eq!(response.ingredients, vec!["eggs"]);
    }

    #[tokio::test]
    async fn test_missing_eco_result_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = BananaKartClient::new(server.uri());
        let recipe_id = Uuid::new_v4();
        assert!(client.latest_eco_result(recipe_id).await.unwrap().is_none());
        assert!(client.dashboard(recipe_id).await.unwrap().current().is_none());
    }

    #[tokio::test]
    async fn test_session_is_percent_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/carts/a%2Fb%3Fc"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"items": [], "total": 0.0})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = BananaKartClient::new(server.uri());
        let cart = client.cart("a/b?c").await.unwrap();
        assert!(cart.items.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_base_url_is_not_sent() {
        let client = BananaKartClient::new("not a url");
        let err = client.cart("s1").await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[test]
    fn test_ws_url() {
        let id = Uuid::nil();
        let client = BananaKartClient::new("https://kart.example.com");
        assert_eq!(
            client.eco_results_ws_url(id),
            format!("wss://kart.example.com/ws/eco_results?recipe_id={}", id)
        );
        let client = BananaKartClient::new("http://127.0.0.1:8000/");
        assert!(client.eco_results_ws_url(id).starts_with("ws://127.0.0.1:8000/ws/"));
    }
}
