//! Ingredient sourcing across farmers markets and big-box stores.
//!
//! Markets are tried first in dataset order, then stores; anything still
//! unmatched is assigned to the first store so every ingredient lands somewhere.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::errors::AppError;
use crate::models::{
    BigBoxStore, FarmersMarket, Ingredient, MarketAllocation, SourcingPlan, StoreAllocation,
};

pub const MARKETS_FILE: &str = "farmers_markets.json";
pub const STORES_FILE: &str = "big_box_stores.json";

/// Markets considered per allocation.
pub const DEFAULT_MARKET_LIMIT: usize = 5;

/// Supplier datasets loaded at startup.
#[derive(Debug, Clone, Default)]
pub struct SupplierCatalog {
    markets: Vec<FarmersMarket>,
    stores: Vec<BigBoxStore>,
}

impl SupplierCatalog {
    pub fn new(markets: Vec<FarmersMarket>, stores: Vec<BigBoxStore>) -> Self {
        Self { markets, stores }
    }

    /// Load both datasets from `data_dir`. Missing files are treated as empty.
    pub fn load(data_dir: &Path) -> Result<Self, AppError> {
        Ok(Self {
            markets: load_json_list(&data_dir.join(MARKETS_FILE))?,
            stores: load_json_list(&data_dir.join(STORES_FILE))?,
        })
    }

    pub fn market_count(&self) -> usize {
        self.markets.len()
    }

    pub fn store_count(&self) -> usize {
        self.stores.len()
    }

    /// Up to `limit` markets whose ZIP code starts with `zipcode`.
    pub fn find_markets(&self, zipcode: &str, limit: usize) -> Vec<&FarmersMarket> {
        let zipcode = zipcode.trim();
        if zipcode.is_empty() {
            return Vec::new();
        }
        self.markets
            .iter()
            .filter(|m| m.zipcode.starts_with(zipcode))
            .take(limit)
            .collect()
    }

    /// Split ingredients between nearby markets and stores.
    pub fn allocate(
        &self,
        ingredients: &[Ingredient],
        zipcode: &str,
        market_limit: usize,
    ) -> SourcingPlan {
        let mut remaining: Vec<Ingredient> = ingredients.to_vec();
        let mut plan = SourcingPlan::default();

        for market in self.find_markets(zipcode, market_limit) {
            let matched = take_matching(&mut remaining, &market.products);
            if !matched.is_empty() {
                plan.farmers_markets.push(MarketAllocation {
                    market: market.clone(),
                    items: matched,
                });
            }
        }

        let fallback;
        let stores: &[BigBoxStore] = if self.stores.is_empty() {
            fallback = [generic_store()];
            &fallback
        } else {
            &self.stores
        };

        for store in stores {
            let matched = take_matching(&mut remaining, &store.inventory);
            if !matched.is_empty() {
                plan.big_box.push(StoreAllocation {
                    store: store.clone(),
                    items: matched,
                });
            }
        }

        if !remaining.is_empty() {
            plan.big_box.push(StoreAllocation {
                store: stores[0].clone(),
                items: remaining,
            });
        }

        plan
    }
}

/// Store used when no big-box dataset is configured.
pub fn generic_store() -> BigBoxStore {
    BigBoxStore {
        name: "Generic BigBox".to_string(),
        address: Some("123 Retail Rd".to_string()),
        hours: Some("Daily 8:00-21:00".to_string()),
        inventory: ["pantry", "produce", "meat", "dairy"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    }
}

/// Whether any non-empty keyword occurs in `name`, ignoring case.
fn keyword_match(name: &str, keywords: &[String]) -> bool {
    let name = name.to_lowercase();
    keywords
        .iter()
        .filter(|k| !k.is_empty())
        .any(|k| name.contains(&k.to_lowercase()))
}

/// Remove and return every ingredient whose name matches a keyword, keeping order.
fn take_matching(remaining: &mut Vec<Ingredient>, keywords: &[String]) -> Vec<Ingredient> {
    let (matched, rest): (Vec<_>, Vec<_>) = std::mem::take(remaining)
        .into_iter()
        .partition(|item| keyword_match(item.name_or_empty(), keywords));
    *remaining = rest;
    matched
}

fn load_json_list<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, AppError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("Dataset {:?} not found, using an empty list", path);
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(AppError::Internal(format!(
                "Failed to read {:?}: {}",
                path, e
            )))
        }
    };
    serde_json::from_str(&raw)
        .map_err(|e| AppError::Internal(format!("Invalid dataset {:?}: {}", path, e)))
}
