//! BananaKart backend
//!
//! Recipe intake, ingredient sourcing and eco impact simulation over a REST +
//! WebSocket API, plus a typed client for the same contract.

pub mod api;
pub mod auth;
pub mod cart;
pub mod client;
pub mod config;
pub mod db;
pub mod errors;
pub mod feed;
pub mod generation;
pub mod models;
pub mod parser;
pub mod simulation;
pub mod sourcing;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use cart::CartStore;
use config::Config;
use db::Repository;
use feed::EcoFeed;
use generation::{GeminiClient, HuggingFaceClient, RecipeGenerator, TextGenerator};
use simulation::conditions::ConditionsClient;
use sourcing::SupplierCatalog;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
    pub feed: EcoFeed,
    pub catalog: Arc<SupplierCatalog>,
    pub carts: Arc<CartStore>,
    pub conditions: ConditionsClient,
    pub generator: Arc<RecipeGenerator>,
    /// `None` when no Gemini key is configured; `/llm_recipe` then always falls back
    pub gemini: Option<Arc<dyn TextGenerator>>,
}

impl AppState {
    /// Wire up every service from configuration.
    pub fn new(config: Config, repo: Arc<Repository>, catalog: SupplierCatalog) -> Self {
        let hf = HuggingFaceClient::from_config(&config.generator)
            .map(|client| Arc::new(client) as Arc<dyn TextGenerator>);
        let generator = RecipeGenerator::new(
            hf,
            Some(repo.clone()),
            config.generator.default_servings,
            config.generator.cache_ttl_days,
        );
        let gemini = GeminiClient::from_config(&config.gemini)
            .map(|client| Arc::new(client) as Arc<dyn TextGenerator>);

        Self {
            conditions: ConditionsClient::new(config.simulation.clone()),
            generator: Arc::new(generator),
            gemini,
            repo,
            catalog: Arc::new(catalog),
            carts: Arc::new(CartStore::new()),
            feed: EcoFeed::new(),
            config: Arc::new(config),
        }
    }
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let psk = state.config.api_psk.clone();
    let auth = middleware::from_fn(move |req, next| auth::psk_auth_layer(psk.clone(), req, next));

    // Read and cart routes under /api
    let api_routes = Router::new()
        .route("/recipes/{id}", get(api::get_recipe))
        .route("/eco_results/{recipe_id}", get(api::latest_eco_result))
        .route(
            "/carts/{session}",
            get(api::get_cart).delete(api::clear_cart),
        )
        .route("/carts/{session}/items", post(api::add_item))
        .route(
            "/carts/{session}/items/{id}",
            put(api::update_item).delete(api::remove_item),
        )
        .route("/carts/{session}/checkout", post(api::checkout))
        .route("/carts/{session}/orders", get(api::list_orders));

    // Submission routes at the root, where the front ends post them
    let submit_routes = Router::new()
        .route("/analyze", post(api::analyze))
        .route("/simulate", post(api::simulate))
        .route("/analyze_or_generate", post(api::analyze_or_generate))
        .route("/llm_recipe", post(api::llm_recipe));

    let protected = Router::new()
        .nest("/api", api_routes)
        .merge(submit_routes)
        .layer(auth);

    // Health check and the change feed (no auth required)
    let open_routes = Router::new()
        .route("/health", get(api::health_check))
        .route("/ws/eco_results", get(feed::ws_eco_results));

    Router::new()
        .merge(protected)
        .merge(open_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
