//! Live weather and traffic multipliers.
//!
//! Both lookups degrade to 1.0 on a missing key, a timeout or any malformed reply.

use std::time::Duration;

use serde::Deserialize;

use super::Conditions;
use crate::config::SimulationConfig;

const API_TIMEOUT: Duration = Duration::from_secs(5);

/// Multiplier for an OpenWeatherMap `main` condition.
pub fn weather_multiplier(condition: &str) -> f64 {
    match condition {
        "Clear" => 1.0,
        "Clouds" => 1.05,
        "Rain" => 1.15,
        "Snow" => 1.25,
        "Extreme" => 1.4,
        _ => 1.0,
    }
}

#[derive(Debug, Deserialize)]
struct WeatherReply {
    #[serde(default)]
    weather: Vec<WeatherEntry>,
}

#[derive(Debug, Deserialize)]
struct WeatherEntry {
    main: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlowReply {
    flow_segment_data: Option<FlowSegment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlowSegment {
    current_speed: Option<f64>,
    free_flow_speed: Option<f64>,
}

/// Fetches current conditions for the configured coordinates.
#[derive(Clone)]
pub struct ConditionsClient {
    client: reqwest::Client,
    config: SimulationConfig,
}

impl ConditionsClient {
    pub fn new(config: SimulationConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(API_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    /// Weather and traffic factors, fetched concurrently.
    pub async fn current(&self) -> Conditions {
        let (weather, traffic) = tokio::join!(self.weather_factor(), self.traffic_factor());
        Conditions { weather, traffic }
    }

    pub async fn weather_factor(&self) -> f64 {
        let Some(key) = &self.config.openweather_key else {
            return 1.0;
        };
        let request = self.client.get(&self.config.openweather_url).query(&[
            ("lat", self.config.latitude.to_string()),
            ("lon", self.config.longitude.to_string()),
            ("appid", key.clone()),
        ]);

        match fetch_json::<WeatherReply>(request).await {
            Some(reply) => reply
                .weather
                .first()
                .and_then(|w| w.main.as_deref())
                .map(weather_multiplier)
                .unwrap_or(1.0),
            None => 1.0,
        }
    }

    pub async fn traffic_factor(&self) -> f64 {
        let Some(key) = &self.config.tomtom_key else {
            return 1.0;
        };
        let point = format!("{},{}", self.config.latitude, self.config.longitude);
        let request = self
            .client
            .get(&self.config.tomtom_url)
            .query(&[("point", point), ("key", key.clone())]);

        let Some(segment) = fetch_json::<FlowReply>(request)
            .await
            .and_then(|r| r.flow_segment_data)
        else {
            return 1.0;
        };
        match (segment.current_speed, segment.free_flow_speed) {
            (Some(current), Some(free)) if current > 0.0 && free > 0.0 => {
                (free / current).clamp(0.5, 2.0)
            }
            _ => 1.0,
        }
    }
}

async fn fetch_json<T: serde::de::DeserializeOwned>(request: reqwest::RequestBuilder) -> Option<T> {
    let response = match request.send().await {
        Ok(r) => r,
        Err(e) => {
            tracing::debug!("Conditions lookup failed: {}", e);
            return None;
        }
    };
    if !response.status().is_success() {
        tracing::debug!("Conditions lookup returned {}", response.status());
        return None;
    }
    response.json().await.ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer, keys: bool) -> SimulationConfig {
        SimulationConfig {
            samples: 100,
            openweather_key: keys.then(|| "weather-key".to_string()),
            openweather_url: format!("{}/weather", server.uri()),
            tomtom_key: keys.then(|| "traffic-key".to_string()),
            tomtom_url: format!("{}/flow", server.uri()),
            latitude: 42.3601,
            longitude: -71.0589,
        }
    }

    #[test]
    fn test_weather_multipliers() {
        assert_eq!(weather_multiplier("Rain"), 1.15);
        assert_eq!(weather_multiplier("Drizzle"), 1.0);
    }

    #[tokio::test]
    async fn test_missing_keys_mean_neutral_conditions() {
        let server = MockServer::start().await;
        let client = ConditionsClient::new(config(&server, false));
        assert_eq!(client.current().await, Conditions::default());
    }

    #[tokio::test]
    async fn test_live_conditions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("appid", "weather-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"weather": [{"main": "Snow"}]})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flow"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "flowSegmentData": {"currentSpeed": 10.0, "freeFlowSpeed": 40.0}
            })))
            .mount(&server)
            .await;

        let client = ConditionsClient::new(config(&server, true));
        let conditions = client.current().await;
        assert_eq!(conditions.weather, 1.25);
        // 40 / 10 is clamped to 2.0
        assert_eq!(conditions.traffic, 2.0);
    }

    #[tokio::test]
    async fn test_errors_fall_back_to_neutral() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = ConditionsClient::new(config(&server, true));
        assert_eq!(client.current().await, Conditions::default());
    }
}
