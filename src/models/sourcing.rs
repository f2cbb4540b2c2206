//! Sourcing models and the `/llm_recipe` contract.

use serde::{Deserialize, Serialize};

use super::Ingredient;

/// A farmers market from the local dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FarmersMarket {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub zipcode: String,
    #[serde(default)]
    pub hours: Option<String>,
    /// Product keywords matched against ingredient names
    #[serde(default)]
    pub products: Vec<String>,
}

/// A big-box store from the local dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BigBoxStore {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub hours: Option<String>,
    /// Inventory keywords matched against ingredient names
    #[serde(default)]
    pub inventory: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketAllocation {
    pub market: FarmersMarket,
    pub items: Vec<Ingredient>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreAllocation {
    pub store: BigBoxStore,
    pub items: Vec<Ingredient>,
}

/// Ingredients split between farmers markets and big-box stores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SourcingPlan {
    pub farmers_markets: Vec<MarketAllocation>,
    pub big_box: Vec<StoreAllocation>,
}

/// Request body for `POST /llm_recipe`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRecipeRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zipcode: Option<String>,
}

/// A generated recipe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratedRecipe {
    pub title: String,
    pub servings: u32,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LlmResponseType {
    NeedZip,
    Ok,
}

/// Response for `POST /llm_recipe`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRecipeResponse {
    pub response_type: LlmResponseType,
    pub message: String,
    #[serde(default)]
    pub recipe: Option<GeneratedRecipe>,
    #[serde(default)]
    pub sourcing: Option<SourcingPlan>,
}
