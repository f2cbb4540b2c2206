//! Eco simulation endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{EcoResultRow, SimulationRequest, SimulationResult};
use crate::simulation::run_simulation;
use crate::AppState;

/// POST /simulate - Run the Monte Carlo simulation for a stored recipe.
pub async fn simulate(
    State(state): State<AppState>,
    Json(request): Json<SimulationRequest>,
) -> Result<(StatusCode, Json<SimulationResult>), AppError> {
    if !state.repo.recipe_exists(request.recipe_id).await? {
        return Err(AppError::NotFound(format!(
            "Recipe {} not found",
            request.recipe_id
        )));
    }

    let conditions = state.conditions.current().await;
    let samples = state.config.simulation.samples;
    let result = {
        let mut rng = rand::rng();
        run_simulation(samples, conditions, &mut rng)?
    };

    let row = state
        .repo
        .insert_eco_result(request.recipe_id, &result)
        .await?;
    let receivers = state.feed.publish(row);

    tracing::info!(
        recipe_id = %request.recipe_id,
        eco_score = result.eco_score,
        receivers,
        "Simulation stored"
    );

    Ok((StatusCode::CREATED, Json(result)))
}

/// GET /api/eco_results/{recipe_id} - Latest stored result for a recipe.
pub async fn latest_eco_result(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
) -> Result<Json<EcoResultRow>, AppError> {
    state
        .repo
        .latest_eco_result(recipe_id)
        .await?
        .map(Json)
        .ok_or_else(|| {
            AppError::NotFound(format!("No eco result for recipe {}", recipe_id))
        })
}
