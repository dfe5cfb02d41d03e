//! TheCocktailDB proxy: cocktail search, random pick, and lookup. The
//! upstream reports "no results" as `drinks: null` and callers rely on that.

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

pub struct DrinkApi {
    client: Client,
    base_url: String,
}

impl DrinkApi {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    pub async fn search(&self, query: &str) -> Result<Value, UpstreamError> {
        let url = format!("{}/search.php", self.base_url);
        let mut data = get_json(&self.client, &url, &[("s", query)]).await?;
        ensure_key(&mut data, "drinks", Value::Null);
        Ok(data)
    }

    pub async fn random(&self) -> Result<Value, UpstreamError> {
        let url = format!("{}/random.php", self.base_url);
        let mut data = get_json(&self.client, &url, &[]).await?;
        ensure_key(&mut data, "drinks", Value::Null);
        Ok(data)
    }

    pub async fn by_id(&self, drink_id: &str) -> Result<Value, UpstreamError> {
        let url = format!("{}/lookup.php", self.base_url);
        let mut data = get_json(&self.client, &url, &[("i", drink_id)]).await?;
        ensure_key(&mut data, "drinks", Value::Null);
        Ok(data)
    }
}

/// Fixed record served when the upstream is unreachable.
pub fn mock_drinks() -> Value {
    json!({
        "drinks": [{
            "idDrink": "11007",
            "strDrink": "Margarita",
            "strCategory": "Ordinary Drink",
            "strAlcoholic": "Alcoholic",
            "strGlass": "Cocktail glass",
            "strInstructions": "Rub the rim of the glass with the lime slice...",
            "strDrinkThumb": "https://www.thecocktaildb.com/images/media/drink/5noda61589575158.jpg",
            "strIngredient1": "Tequila",
            "strIngredient2": "Triple sec",
            "strIngredient3": "Lime juice",
            "strMeasure1": "1 1/2 oz",
            "strMeasure2": "1/2 oz",
            "strMeasure3": "1 oz"
        }]
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/drinks/search", get(search))
        .route("/api/drinks/random", get(random))
        .route("/api/drinks/:id", get(detail))
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
    match state.providers.drinks.search(query).await {
        Ok(data) => Ok(Json(data)),
        Err(e @ (UpstreamError::Timeout | UpstreamError::Connect)) => {
            error!(error = %e, "drink search unreachable, serving fallback");
            Ok(Json(mock_drinks()))
        }
        Err(e) => {
            error!(error = %e, "drink search failed");
            Ok(Json(json!({ "drinks": null })))
        }
    }
}

#[instrument(skip(state))]
async fn random(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    match state.providers.drinks.random().await {
        Ok(data) => Ok(Json(data)),
        Err(e) => {
            error!(error = %e, "random drink failed");
            Ok(Json(json!({ "drinks": null })))
        }
    }
}

#[instrument(skip(state))]
async fn detail(
    State(state): State<AppState>,
    Path(drink_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let data = state
        .providers
        .drinks
        .by_id(&drink_id)
        .await
        .map_err(ApiError::from)?;
    match data.get("drinks") {
        Some(Value::Array(drinks)) if !drinks.is_empty() => Ok(Json(data)),
        _ => Err(ApiError::NotFound("drink")),
    }
}
