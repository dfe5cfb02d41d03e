//! WeatherStack proxy. Needs a provisioned API key; without one every call
//! fails fast before any network traffic. WeatherStack reports its own
//! failures inside a 200 body, so the route inspects the payload too.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{instrument, warn};

use super::{get_json, ProviderCallError, UpstreamError};
use crate::{auth::jwt::MaybeAuthUser, error::ApiError, state::AppState};

pub struct WeatherApi {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl WeatherApi {
    pub fn new(client: Client, base_url: String, api_key: Option<String>) -> Self {
        if api_key.is_none() {
            warn!("WEATHERSTACK_API_KEY not set; weather routes will fail fast");
        }
        Self {
            client,
            base_url,
            api_key,
        }
    }

    pub async fn current(&self, location: &str) -> Result<Value, ProviderCallError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(ProviderCallError::ApiKeyMissing)?;
        let url = format!("{}/current", self.base_url);
        let mut data = get_json(
            &self.client,
            &url,
            &[("access_key", key), ("query", location), ("units", "m")],
        )
        .await?;

        if let Some(name) = data
            .pointer("/location/name")
            .and_then(Value::as_str)
            .map(title_case)
        {
            data["location"]["name"] = json!(name);
        }
        Ok(data)
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/weather/current", get(current))
}

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub location: Option<String>,
}

#[instrument(skip(state))]
async fn current(
    State(state): State<AppState>,
    MaybeAuthUser(_user_id): MaybeAuthUser,
    Query(params): Query<WeatherQuery>,
) -> Result<Json<Value>, ApiError> {
    let location = params.location.as_deref().map(str::trim).unwrap_or("");
    if location.is_empty() {
        return Err(ApiError::MissingFields(
            "please provide a city name (e.g., ?location=Chicago)",
        ));
    }

    let data = state
        .providers
        .weather
        .current(location)
        .await
        .map_err(|e| match e {
            ProviderCallError::ApiKeyMissing => ApiError::ApiKeyMissing("weather"),
            ProviderCallError::Upstream(UpstreamError::Timeout) => ApiError::UpstreamTimeout,
            ProviderCallError::Upstream(_) => ApiError::UpstreamUnavailable,
        })?;

    // In-body upstream error: a 404-class code means the location is unknown,
    // anything else is a provider-side failure.
    if let Some(err) = data.get("error") {
        let code = err.get("code").map(|c| c.to_string()).unwrap_or_default();
        warn!(code = %code, "weatherstack error payload");
        if code.contains("404") || code.contains("615") {
            return Err(ApiError::NotFound("location"));
        }
        return Err(ApiError::UpstreamUnavailable);
    }

    Ok(Json(json!({ "success": true, "data": data })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::test_client;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn title_case_formats_city_names() {
        assert_eq!(title_case("new york"), "New York");
        assert_eq!(title_case("CHICAGO"), "Chicago");
        assert_eq!(title_case(""), "");
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_the_network() {
        // Unroutable base URL: a request attempt would error differently.
        let api = WeatherApi::new(test_client(), "http://127.0.0.1:1".into(), None);
        let err = api.current("Chicago").await.unwrap_err();
        assert!(matches!(err, ProviderCallError::ApiKeyMissing));
    }

    #[tokio::test]
    async fn current_sends_key_and_title_cases_location() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/current"))
            .and(query_param("access_key", "k123"))
            .and(query_param("query", "chicago"))
            .and(query_param("units", "m"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "location": {"name": "chicago", "country": "United States"},
                "current": {"temperature": 18}
            })))
            .mount(&server)
            .await;

        let api = WeatherApi::new(test_client(), server.uri(), Some("k123".into()));
        let data = api.current("chicago").await.expect("current");
        assert_eq!(data["location"]["name"], "Chicago");
        assert_eq!(data["current"]["temperature"], 18);
    }
}
