//! Recipe models shared by the analyze, auto and LLM routes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coarse time constraint supplied with a recipe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Tonight,
    Soon,
    Later,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Tonight => "tonight",
            Urgency::Soon => "soon",
            Urgency::Later => "later",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tonight" => Some(Urgency::Tonight),
            "soon" => Some(Urgency::Soon),
            "later" => Some(Urgency::Later),
            _ => None,
        }
    }
}

/// A single ingredient line. Every field is optional because generators and
/// the parser may leave any of them blank.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Ingredient {
    pub name: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, quantity: Option<f64>, unit: Option<&str>) -> Self {
        Self {
            name: Some(name.into()),
            quantity,
            unit: unit.map(str::to_string),
        }
    }

    /// The ingredient name, or an empty string when missing.
    pub fn name_or_empty(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

/// Whether `/analyze_or_generate` recognised the text or synthesised a recipe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecipeMode {
    Parse,
    Generate,
}

/// Request body for `POST /analyze_or_generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<u32>,
}

/// A parsed or generated recipe plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipePlan {
    pub mode: RecipeMode,
    pub title: Option<String>,
    pub servings: u32,
    pub servings_assumed: bool,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<String>,
    pub source: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub urgency: Option<String>,
    #[serde(default)]
    pub meal_time: Option<String>,
}

/// Ingredient row as stored for an analyzed recipe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredIngredient {
    pub ingredient_name: String,
    pub quantity: f64,
    pub unit: String,
}

/// A recipe submitted through `/analyze`, with its extracted ingredients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub recipe_text: String,
    pub urgency: Urgency,
    pub created_at: String,
    pub ingredients: Vec<StoredIngredient>,
}
