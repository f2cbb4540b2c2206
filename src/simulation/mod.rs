//! Monte Carlo eco impact simulation.
//!
//! Samples supplier type, distance, traffic and price noise, then summarises
//! emissions and cost into an eco score. Live weather and traffic conditions
//! scale every sample; see [`conditions`].

pub mod conditions;

use rand::Rng;

use crate::models::SimulationResult;

pub const ROUTE_CLUSTER: &str = "Cluster-SimA";

/// Supplier categories with CO2 per km and base price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Supplier {
    Local,
    Regional,
    BigBox,
}

impl Supplier {
    pub const ALL: [Supplier; 3] = [Supplier::Local, Supplier::Regional, Supplier::BigBox];

    pub fn as_str(&self) -> &'static str {
        match self {
            Supplier::Local => "local",
            Supplier::Regional => "regional",
            Supplier::BigBox => "big_box",
        }
    }

    pub fn co2_per_km(&self) -> f64 {
        match self {
            Supplier::Local => 0.1,
            Supplier::Regional => 0.25,
            Supplier::BigBox => 0.4,
        }
    }

    pub fn base_price(&self) -> f64 {
        match self {
            Supplier::Local => 10.0,
            Supplier::Regional => 8.0,
            Supplier::BigBox => 6.0,
        }
    }
}

/// Multipliers applied to every sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conditions {
    pub weather: f64,
    pub traffic: f64,
}

impl Default for Conditions {
    fn default() -> Self {
        Self {
            weather: 1.0,
            traffic: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    NoSamples,
}

impl std::fmt::Display for SimulationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulationError::NoSamples => write!(f, "n_samples must be a positive integer"),
        }
    }
}

impl std::error::Error for SimulationError {}

/// Run `n_samples` draws and summarise them.
pub fn run_simulation<R: Rng>(
    n_samples: usize,
    conditions: Conditions,
    rng: &mut R,
) -> Result<SimulationResult, SimulationError> {
    if n_samples == 0 {
        return Err(SimulationError::NoSamples);
    }

    let mut emission_sum = [0.0f64; 3];
    let mut emission_count = [0usize; 3];
    let mut costs = Vec::with_capacity(n_samples);
    let mut total_emissions = 0.0;

    for _ in 0..n_samples {
        let idx = rng.random_range(0..Supplier::ALL.len());
        let supplier = Supplier::ALL[idx];

        let distance = rng.random_range(1.0..50.0);
        let traffic_local = normal(rng, 1.0, 0.1).clamp(0.5, 2.0);
        let price_factor = normal(rng, 1.0, 0.15).clamp(0.5, 2.0);

        let emission = distance
            * supplier.co2_per_km()
            * traffic_local
            * conditions.weather
            * conditions.traffic;
        let cost = supplier.base_price() * price_factor;

        emission_sum[idx] += emission;
        emission_count[idx] += 1;
        total_emissions += emission;
        costs.push(cost);
    }

    let n = n_samples as f64;
    let mean_co2 = total_emissions / n;
    let mean_cost = costs.iter().sum::<f64>() / n;
    let std_cost = (costs.iter().map(|c| (c - mean_cost).powi(2)).sum::<f64>() / n).sqrt();

    let eco_score = if mean_co2 >= 0.0 {
        100.0 * (1.0 - mean_co2 / (mean_co2 + 20.0))
    } else {
        0.0
    };
    let co2_saved = 50.0 - mean_co2;
    let variance_cost = if mean_cost != 0.0 {
        std_cost / mean_cost
    } else {
        0.0
    };

    let mut means: Vec<(Supplier, f64)> = Supplier::ALL
        .iter()
        .enumerate()
        .filter(|(i, _)| emission_count[*i] > 0)
        .map(|(i, s)| (*s, emission_sum[i] / emission_count[i] as f64))
        .collect();
    means.sort_by(|a, b| a.1.total_cmp(&b.1));
    let best_sources = means
        .iter()
        .take(2)
        .map(|(s, _)| s.as_str().to_string())
        .collect();

    Ok(SimulationResult {
        eco_score: round4(eco_score),
        co2_saved_kg: round4(co2_saved),
        variance_cost: round4(variance_cost),
        best_sources,
        route_cluster: ROUTE_CLUSTER.to_string(),
    })
}

/// Box-Muller draw from N(mean, std_dev).
fn normal<R: Rng>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
