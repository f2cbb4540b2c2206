//! Models for `POST /analyze`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Urgency;

/// Request body for analyzing and storing a recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub user_id: Uuid,
    pub recipe_text: String,
    pub urgency: Urgency,
}

/// Response for a stored recipe analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub recipe_id: Uuid,
    pub ingredients: Vec<String>,
    pub message: String,
}
