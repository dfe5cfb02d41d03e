//! Bored API proxy: random activity suggestions, optionally filtered by type
//! and participant count.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use rand::seq::SliceRandom;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{get_json, UpstreamError};
use crate::{auth::jwt::AuthUser, error::ApiError, state::AppState};

pub struct HobbyApi {
    client: Client,
    base_url: String,
}

impl HobbyApi {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// `/random` returns a single activity object.
    pub async fn random(&self) -> Result<Value, UpstreamError> {
        let url = format!("{}/random", self.base_url);
        get_json(&self.client, &url, &[]).await
    }

    /// `/filter` returns an array. When both filters are set and the
    /// combination has no matches (404), retry once with the type alone.
    pub async fn filter(
        &self,
        activity_type: Option<&str>,
        participants: Option<&str>,
    ) -> Result<Vec<Value>, UpstreamError> {
        let url = format!("{}/filter", self.base_url);
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(t) = activity_type {
            query.push(("type", t));
        }
        if let Some(p) = participants {
            query.push(("participants", p));
        }

        match (get_json(&self.client, &url, &query).await, activity_type) {
            (Ok(data), _) => Ok(as_activity_list(data)),
            (Err(UpstreamError::Status(404)), Some(t)) if participants.is_some() => {
                debug!("no match for combined filters, retrying with type only");
                let data = get_json(&self.client, &url, &[("type", t)]).await?;
                Ok(as_activity_list(data))
            }
            (Err(e), _) => Err(e),
        }
    }
}

fn as_activity_list(data: Value) -> Vec<Value> {
    match data {
        Value::Array(list) => list,
        other => vec![other],
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/hobbies/random", get(random_activity))
}

#[derive(Debug, Deserialize)]
pub struct HobbyQuery {
    #[serde(rename = "type")]
    pub activity_type: Option<String>,
    pub participants: Option<String>,
}

#[instrument(skip(state))]
async fn random_activity(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Query(params): Query<HobbyQuery>,
) -> Result<Json<Value>, ApiError> {
    let activity_type = params.activity_type.as_deref().filter(|s| !s.is_empty());
    let participants = params.participants.as_deref().filter(|s| !s.is_empty());

    let activity = if activity_type.is_some() || participants.is_some() {
        let candidates = state
            .providers
            .hobbies
            .filter(activity_type, participants)
            .await
            .map_err(|e| match e {
                UpstreamError::Status(404) => ApiError::NotFound("activity"),
                other => other.into(),
            })?;
        candidates
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or(ApiError::NotFound("activity"))?
    } else {
        state
            .providers
            .hobbies
            .random()
            .await
            .map_err(ApiError::from)?
    };

    // The upstream sometimes replies 200 with an error payload.
    if activity.get("error").is_some() {
        return Err(ApiError::NotFound("activity"));
    }
    Ok(Json(activity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::test_client;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn random_returns_single_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/random"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "activity": "Learn to juggle", "type": "recreational", "participants": 1
            })))
            .mount(&server)
            .await;

        let api = HobbyApi::new(test_client(), server.uri());
        let activity = api.random().await.expect("random");
        assert_eq!(activity["activity"], "Learn to juggle");
    }

    #[tokio::test]
    async fn filter_retries_with_type_only_on_404() {
        let server = MockServer::start().await;
        // The combined filter has no matches.
        Mock::given(method("GET"))
            .and(path("/filter"))
            .and(query_param("type", "music"))
            .and(query_param("participants", "4"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        // The type-only retry succeeds.
        Mock::given(method("GET"))
            .and(path("/filter"))
            .and(query_param("type", "music"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"activity": "Practice the piano", "type": "music", "participants": 1}
            ])))
            .mount(&server)
            .await;

        let api = HobbyApi::new(test_client(), server.uri());
        let activities = api.filter(Some("music"), Some("4")).await.expect("filter");
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0]["activity"], "Practice the piano");
    }

    #[tokio::test]
    async fn filter_404_without_both_filters_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/filter"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let api = HobbyApi::new(test_client(), server.uri());
        let err = api.filter(Some("music"), None).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Status(404)));
    }
}
