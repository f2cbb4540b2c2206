//! Configuration module for the BananaKart backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.
//! Variable names for the generation and simulation settings match the ones the
//! deployed services already use (`HF_API_TOKEN`, `GEN_MODEL`, ...).

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_GEN_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.2";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-pro";

/// Settings for the Hugging Face recipe generator and its cache.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Bearer token for the inference API (generation fails without it)
    pub hf_api_token: Option<String>,
    /// Base URL of the inference API
    pub hf_base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Servings used when a request does not specify any
    pub default_servings: u32,
    pub cache_ttl_days: i64,
    pub request_timeout_secs: f64,
    pub max_retries: u32,
}

/// Settings for the Gemini-backed `/llm_recipe` generator.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

/// Settings for the Monte Carlo simulation and its live condition lookups.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub samples: usize,
    pub openweather_key: Option<String>,
    pub openweather_url: String,
    pub tomtom_key: Option<String>,
    pub tomtom_url: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for API authentication (disabled when unset)
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Directory holding `farmers_markets.json` and `big_box_stores.json`
    pub data_dir: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub generator: GeneratorConfig,
    pub gemini: GeminiConfig,
    pub simulation: SimulationConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let api_psk = non_empty_var("BANANAKART_API_PSK");

        let db_path = env::var("BANANAKART_DB_PATH")
            .unwrap_or_else(|_| "./data/bananakart.sqlite".to_string())
            .into();

        let data_dir = env::var("BANANAKART_DATA_DIR")
            .unwrap_or_else(|_| "./data".to_string())
            .into();

        let bind_addr = env::var("BANANAKART_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8000".to_string())
            .parse()
            .map_err(|e| format!("Invalid BANANAKART_BIND_ADDR format: {}", e))?;

        let log_level = env::var("BANANAKART_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let generator = GeneratorConfig {
            hf_api_token: non_empty_var("HF_API_TOKEN"),
            hf_base_url: env::var("HF_BASE_URL")
                .unwrap_or_else(|_| "https://api-inference.huggingface.co".to_string()),
            model: env::var("GEN_MODEL").unwrap_or_else(|_| DEFAULT_GEN_MODEL.to_string()),
            max_tokens: parsed_var("GEN_MAX_TOKENS", 400),
            temperature: parsed_var("GEN_TEMPERATURE", 0.2),
            default_servings: parsed_var("GEN_DEFAULT_SERVINGS", 1u32).max(1),
            cache_ttl_days: parsed_var("GEN_CACHE_TTL_DAYS", 7),
            request_timeout_secs: parsed_var("REQUEST_TIMEOUT_SECONDS", 20.0),
            max_retries: parsed_var("HF_MAX_RETRIES", 2),
        };

        let gemini = GeminiConfig {
            api_key: non_empty_var("GEMINI_API_KEY"),
            base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string()),
            model: env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
        };

        let simulation = SimulationConfig {
            samples: parsed_var("SIM_SAMPLES", 10_000usize),
            openweather_key: non_empty_var("OPENWEATHER_KEY"),
            openweather_url: env::var("OPENWEATHER_URL").unwrap_or_else(|_| {
                "https://api.openweathermap.org/data/2.5/weather".to_string()
            }),
            tomtom_key: non_empty_var("TOMTOM_KEY"),
            tomtom_url: env::var("TOMTOM_URL").unwrap_or_else(|_| {
                "https://api.tomtom.com/traffic/services/4/flowSegmentData/relative0/10/json"
                    .to_string()
            }),
            latitude: parsed_var("DEFAULT_LAT", 42.3601),
            longitude: parsed_var("DEFAULT_LON", -71.0589),
        };

        Ok(Self {
            api_psk,
            db_path,
            data_dir,
            bind_addr,
            log_level,
            generator,
            gemini,
            simulation,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Read and parse a variable, falling back to `default` when unset or malformed.
fn parsed_var<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        for key in [
            "BANANAKART_API_PSK",
            "BANANAKART_DB_PATH",
            "BANANAKART_DATA_DIR",
            "BANANAKART_BIND_ADDR",
            "BANANAKART_LOG_LEVEL",
            "GEN_MODEL",
            "GEN_DEFAULT_SERVINGS",
            "SIM_SAMPLES",
        ] {
            env::remove_var(key);
        }

        let config = Config::from_env().unwrap();

        assert!(config.api_psk.is_none());
        assert_eq!(config.db_path, PathBuf::from("./data/bananakart.sqlite"));
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8000");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.generator.model, DEFAULT_GEN_MODEL);
        assert_eq!(config.generator.default_servings, 1);
        assert_eq!(config.simulation.samples, 10_000);
    }

    #[test]
    fn test_parsed_var_falls_back_on_garbage() {
        env::set_var("BANANAKART_TEST_GARBAGE", "not-a-number");
        assert_eq!(parsed_var("BANANAKART_TEST_GARBAGE", 7i64), 7);
        env::remove_var("BANANAKART_TEST_GARBAGE");
    }
}
