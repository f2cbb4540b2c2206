//! Eco impact simulation models.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for `POST /simulate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub recipe_id: Uuid,
}

/// Eco impact metrics for a recipe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationResult {
    /// 0-100, higher is greener
    pub eco_score: f64,
    pub co2_saved_kg: f64,
    /// Coefficient of variation of the sampled cost
    pub variance_cost: f64,
    pub best_sources: Vec<String>,
    #[serde(default)]
    pub route_cluster: String,
}

/// A stored simulation result; this is the payload of the `eco_results` change feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EcoResultRow {
    pub id: Uuid,
    pub recipe_id: Uuid,
    #[serde(flatten)]
    pub result: SimulationResult,
    pub created_at: String,
}
