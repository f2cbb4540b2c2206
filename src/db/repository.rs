//! Database repository for recipes, eco results and the generator cache.
//!
//! UUIDs are stored as hyphenated text so rows stay readable from the sqlite shell.

use chrono::{Duration, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{EcoResultRow, SimulationResult, StoredIngredient, StoredRecipe, Urgency};

/// A generator response to remember.
#[derive(Debug, Clone)]
pub struct CacheEntry<'a> {
    pub key_hash: &'a str,
    pub query: &'a str,
    pub servings: u32,
    pub provider: &'a str,
    pub model: &'a str,
    pub response_json: &'a serde_json::Value,
}

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== RECIPE OPERATIONS ====================

    /// Store a recipe and its ingredients in one transaction.
    pub async fn create_recipe(
        &self,
        user_id: Uuid,
        recipe_text: &str,
        urgency: Urgency,
        ingredients: &[StoredIngredient],
    ) -> Result<StoredRecipe, AppError> {
        let id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO recipes (id, user_id, recipe_text, urgency, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(recipe_text)
        .bind(urgency.as_str())
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        for ingredient in ingredients {
            sqlx::query(
                "INSERT INTO ingredients (recipe_id, ingredient_name, quantity, unit) VALUES (?, ?, ?, ?)",
            )
            .bind(id.to_string())
            .bind(&ingredient.ingredient_name)
            .bind(ingredient.quantity)
            .bind(&ingredient.unit)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(StoredRecipe {
            id,
            user_id,
            recipe_text: recipe_text.to_string(),
            urgency,
            created_at: now,
            ingredients: ingredients.to_vec(),
        })
    }

    /// Get a recipe with its ingredients.
    pub async fn get_recipe(&self, id: Uuid) -> Result<Option<StoredRecipe>, AppError> {
        let row = sqlx::query(
            "SELECT id, user_id, recipe_text, urgency, created_at FROM recipes WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let ingredient_rows = sqlx::query(
            "SELECT ingredient_name, quantity, unit FROM ingredients WHERE recipe_id = ? ORDER BY id",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let urgency: String = row.get("urgency");
        Ok(Some(StoredRecipe {
            id: parse_uuid(row.get("id"))?,
            user_id: parse_uuid(row.get("user_id"))?,
            recipe_text: row.get("recipe_text"),
            urgency: Urgency::parse(&urgency).ok_or_else(|| {
                AppError::Database(format!("Stored recipe has unknown urgency {}", urgency))
            })?,
            created_at: row.get("created_at"),
            ingredients: ingredient_rows
                .iter()
                .map(|r| StoredIngredient {
                    ingredient_name: r.get("ingredient_name"),
                    quantity: r.get("quantity"),
                    unit: r.get("unit"),
                })
                .collect(),
        }))
    }

    pub async fn recipe_exists(&self, id: Uuid) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 AS present FROM recipes WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    // ==================== ECO RESULT OPERATIONS ====================

    /// Store a simulation result for a recipe.
    pub async fn insert_eco_result(
        &self,
        recipe_id: Uuid,
        result: &SimulationResult,
    ) -> Result<EcoResultRow, AppError> {
        let id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();
        let sources_json = serde_json::to_string(&result.best_sources)?;

        sqlx::query(
            "INSERT INTO eco_results (id, recipe_id, eco_score, co2_saved_kg, variance_cost, best_sources, route_cluster, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(id.to_string())
        .bind(recipe_id.to_string())
        .bind(result.eco_score)
        .bind(result.co2_saved_kg)
        .bind(result.variance_cost)
        .bind(&sources_json)
        .bind(&result.route_cluster)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(EcoResultRow {
            id,
            recipe_id,
            result: result.clone(),
            created_at: now,
        })
    }

    /// The most recent simulation result for a recipe.
    pub async fn latest_eco_result(&self, recipe_id: Uuid) -> Result<Option<EcoResultRow>, AppError> {
        let row = sqlx::query(
            "SELECT id, recipe_id, eco_score, co2_saved_kg, variance_cost, best_sources, route_cluster, created_at FROM eco_results WHERE recipe_id = ? ORDER BY created_at DESC, rowid DESC LIMIT 1"
        )
        .bind(recipe_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(eco_result_from_row).transpose()
    }

    // ==================== GENERATOR CACHE ====================

    /// Look up a cached generator response younger than `ttl_days`.
    pub async fn cache_lookup(
        &self,
        key_hash: &str,
        ttl_days: i64,
    ) -> Result<Option<serde_json::Value>, AppError> {
        let threshold = (Utc::now() - Duration::days(ttl_days)).to_rfc3339();
        let row = sqlx::query(
            "SELECT response_json FROM gen_cache WHERE key_hash = ? AND created_at >= ? LIMIT 1",
        )
        .bind(key_hash)
        .bind(&threshold)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let raw: String = row.get("response_json");
                Ok(Some(serde_json::from_str(&raw)?))
            }
            None => Ok(None),
        }
    }

    /// Insert or refresh a cached generator response.
    pub async fn cache_store(&self, entry: &CacheEntry<'_>) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        let raw = serde_json::to_string(entry.response_json)?;

        sqlx::query(
            r#"
            INSERT INTO gen_cache (key_hash, query_text, servings, provider, model, response_json, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(key_hash) DO UPDATE SET
                query_text = excluded.query_text,
                servings = excluded.servings,
                provider = excluded.provider,
                model = excluded.model,
                response_json = excluded.response_json,
                created_at = excluded.created_at
            "#,
        )
        .bind(entry.key_hash)
        .bind(entry.query)
        .bind(i64::from(entry.servings))
        .bind(entry.provider)
        .bind(entry.model)
        .bind(&raw)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn parse_uuid(raw: String) -> Result<Uuid, AppError> {
    Uuid::parse_str(&raw).map_err(|e| AppError::Database(format!("Invalid stored id {}: {}", raw, e)))
}

fn eco_result_from_row(row: &SqliteRow) -> Result<EcoResultRow, AppError> {
    let sources: String = row.get("best_sources");
    Ok(EcoResultRow {
        id: parse_uuid(row.get("id"))?,
        recipe_id: parse_uuid(row.get("recipe_id"))?,
        result: SimulationResult {
            eco_score: row.get("eco_score"),
            co2_saved_kg: row.get("co2_saved_kg"),
            variance_cost: row.get("variance_cost"),
            best_sources: serde_json::from_str(&sources)?,
            route_cluster: row.get("route_cluster"),
        },
        created_at: row.get("created_at"),
    })
}
