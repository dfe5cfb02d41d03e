//! Open Library proxy: book search and work details. Search falls back to a
//! small fixed record set when the upstream is unreachable.

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

const SEARCH_FIELDS: &str =
    "key,title,author_name,first_publish_year,isbn,cover_i,publisher,number_of_pages_median,subject";

pub struct BookApi {
    client: Client,
    base_url: String,
}

impl BookApi {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    pub async fn search(&self, query: &str, limit: i64) -> Result<Value, UpstreamError> {
        let url = format!("{}/search.json", self.base_url);
        let limit = limit.to_string();
        let mut data = get_json(
            &self.client,
            &url,
            &[("q", query), ("limit", &limit), ("fields", SEARCH_FIELDS)],
        )
        .await?;
        ensure_key(&mut data, "docs", json!([]));
        ensure_key(&mut data, "numFound", json!(0));
        Ok(data)
    }

    /// `work_key` must already be in `/works/...` form. A 404 from upstream
    /// means no such work.
    pub async fn details(&self, work_key: &str) -> Result<Option<Value>, UpstreamError> {
        let url = format!("{}{}.json", self.base_url, work_key);
        match get_json(&self.client, &url, &[]).await {
            Ok(data) => Ok(Some(data)),
            Err(UpstreamError::Status(404)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Fixed records served when Open Library cannot be reached.
pub fn mock_search_results(limit: i64) -> Value {
    let docs = vec![
        json!({
            "key": "/works/OL45804W",
            "title": "To Kill a Mockingbird",
            "author_name": ["Harper Lee"],
            "first_publish_year": 1960,
            "cover_i": 8228691,
            "publisher": ["J. B. Lippincott & Co."],
            "subject": ["Fiction", "Southern United States"]
        }),
        json!({
            "key": "/works/OL27258W",
            "title": "1984",
            "author_name": ["George Orwell"],
            "first_publish_year": 1949,
            "cover_i": 8231219,
            "publisher": ["Secker & Warburg"],
            "subject": ["Dystopia", "Political fiction"]
        }),
    ];
    let take = docs.len().min(limit.max(0) as usize);
    let docs: Vec<Value> = docs.into_iter().take(take).collect();
    json!({ "docs": docs, "numFound": take })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/books/search", get(search))
        .route("/api/books/details/*key", get(details))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    20
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
    match state.providers.books.search(query, params.limit).await {
        Ok(data) => Ok(Json(data)),
        Err(e @ (UpstreamError::Timeout | UpstreamError::Connect)) => {
            error!(error = %e, "book search unreachable, serving fallback");
            Ok(Json(mock_search_results(params.limit)))
        }
        Err(e) => {
            error!(error = %e, "book search failed");
            Ok(Json(json!({ "docs": [], "numFound": 0 })))
        }
    }
}

#[instrument(skip(state))]
async fn details(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let work_key = normalize_work_key(&key);
    match state.providers.books.details(&work_key).await {
        Ok(Some(data)) => Ok(Json(data)),
        Ok(None) => Err(ApiError::NotFound("book")),
        Err(e) => Err(e.into()),
    }
}

/// The wildcard segment may arrive as `OL45804W`, `works/OL45804W`, or a full
/// `/works/OL45804W`; upstream wants the last form.
fn normalize_work_key(key: &str) -> String {
    let key = key.trim_start_matches('/');
    if let Some(rest) = key.strip_prefix("works/") {
        format!("/works/{rest}")
    } else {
        format!("/works/{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::test_client;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn work_key_normalization() {
        assert_eq!(normalize_work_key("OL45804W"), "/works/OL45804W");
        assert_eq!(normalize_work_key("works/OL45804W"), "/works/OL45804W");
        assert_eq!(normalize_work_key("/works/OL45804W"), "/works/OL45804W");
    }

    #[test]
    fn mock_results_respect_the_limit() {
        let one = mock_search_results(1);
        assert_eq!(one["docs"].as_array().unwrap().len(), 1);
        assert_eq!(one["numFound"], 1);
        let plenty = mock_search_results(20);
        assert_eq!(plenty["docs"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn search_sends_field_list_and_normalizes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .and(query_param("q", "orwell"))
            .and(query_param("fields", SEARCH_FIELDS))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"numFound": 0})))
            .mount(&server)
            .await;

        let api = BookApi::new(test_client(), server.uri());
        let data = api.search("orwell", 20).await.expect("search");
        assert_eq!(data["docs"], json!([]));
    }

    #[tokio::test]
    async fn details_404_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/works/OL0W.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let api = BookApi::new(test_client(), server.uri());
        let result = api.details("/works/OL0W").await.expect("details");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn unreachable_upstream_is_a_transport_error() {
        let api = BookApi::new(test_client(), "http://127.0.0.1:1".into());
        let err = api.search("anything", 20).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Connect | UpstreamError::Timeout));
    }
}
