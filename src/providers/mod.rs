use std::time::Duration;

use axum::Router;
use reqwest::Client;
use thiserror::Error;

use crate::config::ProviderConfig;
use crate::error::ApiError;
use crate::state::AppState;

pub mod art;
pub mod books;
pub mod drinks;
pub mod hobbies;
pub mod meals;
pub mod nasa;
pub mod weather;

pub use art::ArtApi;
pub use books::BookApi;
pub use drinks::DrinkApi;
pub use hobbies::HobbyApi;
pub use meals::MealApi;
pub use nasa::NasaApi;
pub use weather::WeatherApi;

/// Every outbound call is bounded by this; there is no retry beyond the
/// day-walk in the NASA backgrounds operation.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport-level failure of an upstream call. The route layer decides
/// whether this turns into fallback data, an empty result, or an error body.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream request timed out")]
    Timeout,
    #[error("could not connect to upstream")]
    Connect,
    #[error("upstream returned status {0}")]
    Status(u16),
    #[error("upstream returned an undecodable body")]
    Decode,
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            UpstreamError::Timeout
        } else if e.is_decode() {
            UpstreamError::Decode
        } else {
            // is_connect and the rest of the transport failures
            UpstreamError::Connect
        }
    }
}

impl From<UpstreamError> for ApiError {
    fn from(e: UpstreamError) -> Self {
        match e {
            UpstreamError::Timeout => ApiError::UpstreamTimeout,
            _ => ApiError::UpstreamUnavailable,
        }
    }
}

/// Failure of a keyed provider: either the key was never provisioned (checked
/// before any network traffic) or the call itself failed.
#[derive(Debug, Error)]
pub enum ProviderCallError {
    #[error("API key not configured")]
    ApiKeyMissing,
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl From<reqwest::Error> for ProviderCallError {
    fn from(e: reqwest::Error) -> Self {
        ProviderCallError::Upstream(e.into())
    }
}

/// GET `url` with `query`, demanding a 2xx JSON body.
pub(crate) async fn get_json(
    client: &Client,
    url: &str,
    query: &[(&str, &str)],
) -> Result<serde_json::Value, UpstreamError> {
    let resp = client.get(url).query(query).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(UpstreamError::Status(status.as_u16()));
    }
    let value = resp.json::<serde_json::Value>().await?;
    Ok(value)
}

/// Guarantees the expected top-level key exists so a thin upstream body never
/// breaks the caller's contract.
pub(crate) fn ensure_key(value: &mut serde_json::Value, key: &str, default: serde_json::Value) {
    if let serde_json::Value::Object(map) = value {
        map.entry(key.to_string()).or_insert(default);
    }
}

/// One stateless wrapper per external provider, constructed once at startup
/// and shared read-only across request handlers.
pub struct Providers {
    pub meals: MealApi,
    pub books: BookApi,
    pub art: ArtApi,
    pub drinks: DrinkApi,
    pub weather: WeatherApi,
    pub nasa: NasaApi,
    pub hobbies: HobbyApi,
}

impl Providers {
    pub fn new(cfg: &ProviderConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(UPSTREAM_TIMEOUT).build()?;
        Ok(Self {
            meals: MealApi::new(client.clone(), cfg.meal_base_url.clone()),
            books: BookApi::new(client.clone(), cfg.book_base_url.clone()),
            art: ArtApi::new(client.clone(), cfg.art_base_url.clone()),
            drinks: DrinkApi::new(client.clone(), cfg.drink_base_url.clone()),
            weather: WeatherApi::new(
                client.clone(),
                cfg.weather_base_url.clone(),
                cfg.weather_api_key.clone(),
            ),
            nasa: NasaApi::new(
                client.clone(),
                cfg.nasa_base_url.clone(),
                cfg.nasa_api_key.clone(),
            ),
            hobbies: HobbyApi::new(client, cfg.hobby_base_url.clone()),
        })
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(meals::router())
        .merge(books::router())
        .merge(art::router())
        .merge(drinks::router())
        .merge(weather::router())
        .merge(nasa::router())
        .merge(hobbies::router())
}

#[cfg(test)]
pub(crate) fn test_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .expect("client")
}
