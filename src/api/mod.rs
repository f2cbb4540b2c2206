//! REST API module.
//!
//! Handlers return their DTOs directly on success; failures go through
//! [`AppError`](crate::errors::AppError) and its JSON error envelope.

mod carts;
mod recipes;
mod simulate;

pub use carts::*;
pub use recipes::*;
pub use simulate::*;

use axum::Json;
use serde_json::{json, Value};

/// GET /health - Liveness probe.
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
