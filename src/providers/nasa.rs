//! NASA proxy: APOD, Mars rover photos, and the dashboard backgrounds walk.
//! All operations need NASA_API_KEY and fail fast without it.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use time::{format_description::FormatItem, macros::format_description, Date, OffsetDateTime};
use tracing::{debug, instrument, warn};

use super::{get_json, ProviderCallError, UpstreamError};
use crate::{auth::jwt::MaybeAuthUser, error::ApiError, state::AppState};

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Upper bound on how many days the backgrounds walk may step back; keeps the
/// loop bounded when a stretch of days has no image entries.
const BACKGROUNDS_DAY_BUDGET: usize = 20;

pub struct NasaApi {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl NasaApi {
    pub fn new(client: Client, base_url: String, api_key: Option<String>) -> Self {
        if api_key.is_none() {
            warn!("NASA_API_KEY not set; NASA routes will fail fast");
        }
        Self {
            client,
            base_url,
            api_key,
        }
    }

    fn key(&self) -> Result<&str, ProviderCallError> {
        self.api_key
            .as_deref()
            .ok_or(ProviderCallError::ApiKeyMissing)
    }

    pub async fn apod(&self, date: Option<&str>) -> Result<Value, ProviderCallError> {
        let key = self.key()?;
        let url = format!("{}/planetary/apod", self.base_url);
        let mut query = vec![("api_key", key)];
        if let Some(date) = date {
            query.push(("date", date));
        }
        Ok(get_json(&self.client, &url, &query).await?)
    }

    pub async fn mars_photos(
        &self,
        rover: &str,
        earth_date: Option<&str>,
        page: i64,
    ) -> Result<Value, ProviderCallError> {
        let key = self.key()?;
        let url = format!(
            "{}/mars-photos/api/v1/rovers/{}/photos",
            self.base_url, rover
        );
        let today = today_string();
        let date = earth_date.unwrap_or(&today);
        let page = page.to_string();
        Ok(get_json(
            &self.client,
            &url,
            &[("api_key", key), ("earth_date", date), ("page", &page)],
        )
        .await?)
    }

    /// Walks backward from today one day at a time, keeping image entries
    /// only, until `count` images are collected or the day budget runs out.
    pub async fn backgrounds(&self, count: usize) -> Result<Vec<Value>, ProviderCallError> {
        self.key()?;
        let count = count.clamp(1, 10);
        let mut images = Vec::with_capacity(count);
        let mut day = OffsetDateTime::now_utc().date();

        for _ in 0..BACKGROUNDS_DAY_BUDGET {
            if images.len() >= count {
                break;
            }
            let date = format_date(day);
            match self.apod(Some(&date)).await {
                Ok(entry) if entry.get("media_type").and_then(Value::as_str) == Some("image") => {
                    images.push(entry);
                }
                Ok(_) => debug!(%date, "skipping non-image apod entry"),
                Err(ProviderCallError::ApiKeyMissing) => {
                    return Err(ProviderCallError::ApiKeyMissing)
                }
                // A single bad day does not abort the walk.
                Err(e) => debug!(%date, error = %e, "skipping failed apod fetch"),
            }
            day = match day.previous_day() {
                Some(d) => d,
                None => break,
            };
        }
        Ok(images)
    }
}

fn format_date(d: Date) -> String {
    d.format(DATE_FORMAT).unwrap_or_default()
}

fn today_string() -> String {
    format_date(OffsetDateTime::now_utc().date())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/nasa/apod", get(apod))
        .route("/api/nasa/mars-photos", get(mars_photos))
        .route("/api/nasa/backgrounds", get(backgrounds))
}

fn map_err(e: ProviderCallError) -> ApiError {
    match e {
        ProviderCallError::ApiKeyMissing => ApiError::ApiKeyMissing("NASA"),
        ProviderCallError::Upstream(UpstreamError::Timeout) => ApiError::UpstreamTimeout,
        ProviderCallError::Upstream(_) => ApiError::UpstreamUnavailable,
    }
}

#[derive(Debug, Deserialize)]
pub struct ApodQuery {
    pub date: Option<String>,
}

#[instrument(skip(state))]
async fn apod(
    State(state): State<AppState>,
    MaybeAuthUser(_user_id): MaybeAuthUser,
    Query(params): Query<ApodQuery>,
) -> Result<Json<Value>, ApiError> {
    let data = state
        .providers
        .nasa
        .apod(params.date.as_deref())
        .await
        .map_err(map_err)?;
    Ok(Json(json!({ "success": true, "data": data })))
}

#[derive(Debug, Deserialize)]
pub struct MarsQuery {
    #[serde(default = "default_rover")]
    pub rover: String,
    pub earth_date: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_rover() -> String {
    "curiosity".into()
}
fn default_page() -> i64 {
    1
}

#[instrument(skip(state))]
async fn mars_photos(
    State(state): State<AppState>,
    MaybeAuthUser(_user_id): MaybeAuthUser,
    Query(params): Query<MarsQuery>,
) -> Result<Json<Value>, ApiError> {
    let data = state
        .providers
        .nasa
        .mars_photos(&params.rover, params.earth_date.as_deref(), params.page)
        .await
        .map_err(map_err)?;
    Ok(Json(json!({ "success": true, "data": data })))
}

#[derive(Debug, Deserialize)]
pub struct BackgroundsQuery {
    #[serde(default = "default_count")]
    pub count: usize,
}

fn default_count() -> usize {
    5
}

#[instrument(skip(state))]
async fn backgrounds(
    State(state): State<AppState>,
    MaybeAuthUser(_user_id): MaybeAuthUser,
    Query(params): Query<BackgroundsQuery>,
) -> Result<Json<Value>, ApiError> {
    let images = state
        .providers
        .nasa
        .backgrounds(params.count)
        .await
        .map_err(map_err)?;
    Ok(Json(json!({
        "success": true,
        "count": images.len(),
        "images": images,
    })))
}
