//! Recipe submission endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::generate_llm_recipe;
use crate::models::{
    AnalyzeRequest, AnalyzeResponse, AutoRequest, Ingredient, LlmRecipeRequest,
    LlmRecipeResponse, LlmResponseType, RecipeMode, RecipePlan, StoredIngredient, StoredRecipe,
};
use crate::parser::{self, ParsedIngredient};
use crate::sourcing::DEFAULT_MARKET_LIMIT;
use crate::AppState;

pub const ANALYZE_MESSAGE: &str = "Recipe analyzed and stored.";
pub const NEED_ZIP_MESSAGE: &str =
    "Please provide your ZIP code so I can locate nearby farmers markets.";
pub const SOURCING_MESSAGE: &str = "Here is your recipe and sourcing plan.";

const LLM_DEFAULT_SERVINGS: u32 = 2;

/// POST /analyze - Extract ingredients from a recipe and store both.
pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<(StatusCode, Json<AnalyzeResponse>), AppError> {
    if request.recipe_text.trim().is_empty() {
        return Err(AppError::Validation(
            "recipe_text must not be empty".to_string(),
        ));
    }

    let parsed = parser::parse(&request.recipe_text)
        .map_err(|e| AppError::Internal(format!("Ingredient parsing failed: {}", e)))?;
    let ingredients: Vec<StoredIngredient> =
        parsed.ingredients.into_iter().map(normalize).collect();

    let recipe = state
        .repo
        .create_recipe(
            request.user_id,
            &request.recipe_text,
            request.urgency,
            &ingredients,
        )
        .await?;

    tracing::info!(
        recipe_id = %recipe.id,
        ingredients = ingredients.len(),
        "Recipe analyzed"
    );

    Ok((
        StatusCode::CREATED,
        Json(AnalyzeResponse {
            recipe_id: recipe.id,
            ingredients: ingredients.into_iter().map(|i| i.ingredient_name).collect(),
            message: ANALYZE_MESSAGE.to_string(),
        }),
    ))
}

/// Storage form: quantity defaults to 1 and unit to "unit".
fn normalize(parsed: ParsedIngredient) -> StoredIngredient {
    StoredIngredient {
        ingredient_name: parsed.name,
        quantity: parsed.quantity.unwrap_or(1.0),
        unit: parsed.unit.unwrap_or_else(|| "unit".to_string()),
    }
}

/// GET /api/recipes/{id} - A stored recipe with its ingredients.
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StoredRecipe>, AppError> {
    state
        .repo
        .get_recipe(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Recipe {} not found", id)))
}

/// POST /analyze_or_generate - Parse recipe-looking text, generate otherwise.
pub async fn analyze_or_generate(
    State(state): State<AppState>,
    Json(request): Json<AutoRequest>,
) -> Result<Json<RecipePlan>, AppError> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err(AppError::Validation("text must not be empty".to_string()));
    }
    if request.servings == Some(0) {
        return Err(AppError::Validation(
            "servings must be a positive integer".to_string(),
        ));
    }

    let assumed = request.servings.is_none();
    let servings = request
        .servings
        .unwrap_or(state.config.generator.default_servings);

    if parser::looks_like_recipe(text) {
        let parsed = parser::parse(text)
            .map_err(|e| AppError::Internal(format!("Ingredient parsing failed: {}", e)))?;
        return Ok(Json(RecipePlan {
            mode: RecipeMode::Parse,
            title: None,
            servings,
            servings_assumed: assumed,
            ingredients: parsed.ingredients.into_iter().map(Ingredient::from).collect(),
            steps: Vec::new(),
            source: "extractor".to_string(),
            model: None,
            urgency: Some(parsed.urgency.as_str().to_string()),
            meal_time: parsed.meal_time,
        }));
    }

    let plan = state
        .generator
        .generate(text, Some(servings), assumed)
        .await?;
    Ok(Json(plan))
}

/// POST /llm_recipe - Generate a recipe and a sourcing plan for a ZIP code.
pub async fn llm_recipe(
    State(state): State<AppState>,
    Json(request): Json<LlmRecipeRequest>,
) -> Result<Json<LlmRecipeResponse>, AppError> {
    let text = request.text.trim();
    if text.chars().count() < 3 {
        return Err(AppError::Validation(
            "text must be at least 3 characters".to_string(),
        ));
    }
    if request.servings == Some(0) {
        return Err(AppError::Validation(
            "servings must be a positive integer".to_string(),
        ));
    }
    let servings = request.servings.unwrap_or(LLM_DEFAULT_SERVINGS);

    let zipcode = request.zipcode.as_deref().map(str::trim).unwrap_or("");
    if zipcode.is_empty() {
        return Ok(Json(LlmRecipeResponse {
            response_type: LlmResponseType::NeedZip,
            message: NEED_ZIP_MESSAGE.to_string(),
            recipe: None,
            sourcing: None,
        }));
    }
    if !(3..=10).contains(&zipcode.chars().count()) {
        return Err(AppError::Validation(
            "zipcode must be between 3 and 10 characters".to_string(),
        ));
    }

    let recipe = generate_llm_recipe(state.gemini.as_deref(), text, servings).await;
    let sourcing = state
        .catalog
        .allocate(&recipe.ingredients, zipcode, DEFAULT_MARKET_LIMIT);

    tracing::info!(
        zipcode,
        markets = sourcing.farmers_markets.len(),
        stores = sourcing.big_box.len(),
        "Sourcing plan built"
    );

    Ok(Json(LlmRecipeResponse {
        response_type: LlmResponseType::Ok,
        message: SOURCING_MESSAGE.to_string(),
        recipe: Some(recipe),
        sourcing: Some(sourcing),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_defaults() {
        let stored = normalize(ParsedIngredient {
            name: "salt".to_string(),
            quantity: None,
            unit: None,
            form: None,
        });
        assert_eq!(stored.quantity, 1.0);
        assert_eq!(stored.unit, "unit");

        let stored = normalize(ParsedIngredient {
            name: "flour".to_string(),
            quantity: Some(2.5),
            unit: Some("cup".to_string()),
            form: Some("sifted".to_string()),
        });
        assert_eq!(stored.ingredient_name, "flour");
        assert_eq!(stored.quantity, 2.5);
        assert_eq!(stored.unit, "cup");
    }
}
