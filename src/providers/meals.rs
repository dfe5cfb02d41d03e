//! TheMealDB proxy: recipe search and lookup, no API key required.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, instrument};

use super::{ensure_key, get_json, UpstreamError};
use crate::{error::ApiError, state::AppState};

pub struct MealApi {
    client: Client,
    base_url: String,
}

impl MealApi {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    pub async fn search(&self, query: &str) -> Result<Value, UpstreamError> {
        let url = format!("{}/search.php", self.base_url);
        let mut data = get_json(&self.client, &url, &[("s", query)]).await?;
        ensure_key(&mut data, "meals", json!([]));
        Ok(data)
    }

    /// Lookup by id; the upstream signals an unknown id with `meals: null`.
    pub async fn by_id(&self, id: &str) -> Result<Value, UpstreamError> {
        let url = format!("{}/lookup.php", self.base_url);
        let mut data = get_json(&self.client, &url, &[("i", id)]).await?;
        ensure_key(&mut data, "meals", json!([]));
        Ok(data)
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/meals/search", get(search))
        .route("/meals/:id", get(detail))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[instrument(skip(state))]
async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Value>, ApiError> {
    let query = params.q.trim();
    if query.is_empty() {
        return Err(ApiError::MissingFields("query parameter 'q' is required"));
    }
    match state.providers.meals.search(query).await {
        Ok(data) => Ok(Json(data)),
        Err(e) => {
            error!(error = %e, "meal search failed");
            Ok(Json(json!({ "meals": [] })))
        }
    }
}

#[instrument(skip(state))]
async fn detail(
    State(state): State<AppState>,
    Path(meal_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    match state.providers.meals.by_id(&meal_id).await {
        Ok(data) => Ok(Json(data)),
        Err(e) => {
            error!(error = %e, "meal detail failed");
            Ok(Json(json!({ "meals": [] })))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::test_client;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn search_passes_body_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.php"))
            .and(query_param("s", "pad thai"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "meals": [{"idMeal": "52804", "strMeal": "Pad Thai"}]
            })))
            .mount(&server)
            .await;

        let api = MealApi::new(test_client(), server.uri());
        let data = api.search("pad thai").await.expect("search");
        assert_eq!(data["meals"][0]["strMeal"], "Pad Thai");
    }

    #[tokio::test]
    async fn search_normalizes_missing_meals_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let api = MealApi::new(test_client(), server.uri());
        let data = api.search("x").await.expect("search");
        assert_eq!(data["meals"], json!([]));
    }

    #[tokio::test]
    async fn upstream_500_is_a_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lookup.php"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let api = MealApi::new(test_client(), server.uri());
        let err = api.by_id("52804").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Status(500)));
    }
}
