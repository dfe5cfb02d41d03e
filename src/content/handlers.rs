use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::jwt::AuthUser,
    content::{
        dto::{
            page_offset, ContentListResponse, CreateItemRequest, DeletedItemResponse, ItemResponse,
            ListQuery, PageMeta, StatsBuckets, StatsResponse, UpdateItemRequest, MAX_PAGE_SIZE,
        },
        repo::{self, NewSavedItem, SavedItem},
    },
    error::ApiError,
    state::AppState,
};

pub fn content_routes() -> Router<AppState> {
    Router::new()
        .route("/api/content", get(list_items).post(create_item))
        .route("/api/content/stats", get(content_stats))
        .route("/api/content/:id", put(update_item).delete(delete_item))
}

#[instrument(skip(state, payload))]
pub async fn create_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    if payload.category.trim().is_empty()
        || payload.content_type.trim().is_empty()
        || payload.title.trim().is_empty()
    {
        return Err(ApiError::MissingFields(
            "category, type and title are required",
        ));
    }

    // Same external resource saved twice by the same user: hand back the
    // existing record instead of inserting a second row.
    if let Some(external_id) = payload.external_id.as_deref() {
        if let Some(existing) =
            repo::find_duplicate(&state.db, user_id, external_id, &payload.content_type).await?
        {
            warn!(user_id = %user_id, external_id, "duplicate save");
            return Err(ApiError::Duplicate(serde_json::to_value(existing).map_err(
                anyhow::Error::from,
            )?));
        }
    }

    let item = repo::insert(
        &state.db,
        NewSavedItem {
            user_id,
            category: &payload.category,
            content_type: &payload.content_type,
            external_id: payload.external_id.as_deref(),
            title: &payload.title,
            description: payload.description.as_deref(),
            user_notes: &payload.user_notes,
            metadata: payload.metadata.as_ref(),
        },
    )
    .await;

    let item = match item {
        Ok(item) => item,
        // Two concurrent saves of the same resource can both pass the
        // pre-check; the partial unique index decides the race.
        Err(e) if crate::auth::repo::is_unique_violation(&e) => {
            if let Some(external_id) = payload.external_id.as_deref() {
                if let Some(existing) =
                    repo::find_duplicate(&state.db, user_id, external_id, &payload.content_type)
                        .await?
                {
                    warn!(user_id = %user_id, external_id, "duplicate save lost race");
                    return Err(ApiError::Duplicate(
                        serde_json::to_value(existing).map_err(anyhow::Error::from)?,
                    ));
                }
            }
            return Err(ApiError::Internal(e.into()));
        }
        Err(e) => return Err(ApiError::Internal(e.into())),
    };

    info!(user_id = %user_id, item_id = %item.id, content_type = %item.content_type, "item saved");
    Ok((
        StatusCode::CREATED,
        Json(ItemResponse {
            success: true,
            item,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_items(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<ListQuery>,
) -> Result<Json<ContentListResponse>, ApiError> {
    let limit = q.limit.clamp(1, MAX_PAGE_SIZE);
    let page = q.page.max(1);
    let content_type = q.content_type.as_deref();

    let total = repo::count_by_user(&state.db, user_id, content_type).await?;
    let content =
        repo::list_page(&state.db, user_id, content_type, limit, page_offset(page, limit)).await?;

    Ok(Json(ContentListResponse {
        success: true,
        content,
        pagination: PageMeta::compute(total, page, limit),
    }))
}

/// Shallow merge: every key of `patch` overwrites the corresponding key of
/// the stored metadata object; nested objects are replaced wholesale.
pub(crate) fn merge_metadata(
    existing: Option<serde_json::Value>,
    patch: serde_json::Value,
) -> serde_json::Value {
    match (existing, patch) {
        (Some(serde_json::Value::Object(mut base)), serde_json::Value::Object(patch)) => {
            for (k, v) in patch {
                base.insert(k, v);
            }
            serde_json::Value::Object(base)
        }
        (_, patch) => patch,
    }
}

#[instrument(skip(state, payload))]
pub async fn update_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(item_id): Path<i64>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<Json<ItemResponse>, ApiError> {
    let item = owned_item(&state, item_id, user_id).await?;

    let user_notes = payload.user_notes.unwrap_or(item.user_notes);
    let metadata = match payload.metadata {
        Some(patch) => Some(merge_metadata(item.metadata, patch)),
        None => item.metadata,
    };

    let updated = repo::update(&state.db, item_id, &user_notes, metadata.as_ref()).await?;
    info!(user_id = %user_id, item_id = %item_id, "item updated");
    Ok(Json(ItemResponse {
        success: true,
        item: updated,
    }))
}

#[instrument(skip(state))]
pub async fn delete_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(item_id): Path<i64>,
) -> Result<Json<DeletedItemResponse>, ApiError> {
    owned_item(&state, item_id, user_id).await?;
    repo::delete(&state.db, item_id).await?;
    info!(user_id = %user_id, item_id = %item_id, "item deleted");
    Ok(Json(DeletedItemResponse {
        success: true,
        message: "Item deleted successfully",
    }))
}

#[instrument(skip(state))]
pub async fn content_stats(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<StatsResponse>, ApiError> {
    let counts = repo::counts_by_content_type(&state.db, user_id).await?;
    Ok(Json(StatsResponse {
        success: true,
        stats: StatsBuckets::from_counts(&counts),
    }))
}

/// Fetches an item and enforces ownership before any mutation.
async fn owned_item(state: &AppState, item_id: i64, caller: i64) -> Result<SavedItem, ApiError> {
    let item = repo::find_by_id(&state.db, item_id)
        .await?
        .ok_or(ApiError::NotFound("item"))?;
    check_owner(&item, caller)?;
    Ok(item)
}

pub(crate) fn check_owner(item: &SavedItem, caller: i64) -> Result<(), ApiError> {
    if item.user_id != caller {
        warn!(item_id = %item.id, owner = %item.user_id, caller = %caller, "ownership violation");
        return Err(ApiError::Unauthorized);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;
    use serde_json::json;

    #[test]
    fn merge_overwrites_colliding_keys() {
        let merged = merge_metadata(
            Some(json!({"artist": "Monet", "year": 1916})),
            json!({"year": 1917, "medium": "oil"}),
        );
        assert_eq!(merged, json!({"artist": "Monet", "year": 1917, "medium": "oil"}));
    }

    #[test]
    fn merge_is_shallow() {
        let merged = merge_metadata(
            Some(json!({"nested": {"a": 1, "b": 2}})),
            json!({"nested": {"a": 9}}),
        );
        // The nested object is replaced, not deep-merged.
        assert_eq!(merged, json!({"nested": {"a": 9}}));
    }

    #[test]
    fn merge_into_missing_metadata_takes_patch() {
        let merged = merge_metadata(None, json!({"k": "v"}));
        assert_eq!(merged, json!({"k": "v"}));
    }

    fn saved_item(id: i64, user_id: i64) -> SavedItem {
        SavedItem {
            id,
            user_id,
            category: "art".into(),
            content_type: "artwork".into(),
            external_id: Some("27992".into()),
            title: "A Sunday on La Grande Jatte".into(),
            description: None,
            user_notes: String::new(),
            metadata: None,
            created_at: time::OffsetDateTime::UNIX_EPOCH,
            updated_at: time::OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn only_the_owner_may_mutate_an_item() {
        let item = saved_item(10, 7);
        assert!(check_owner(&item, 7).is_ok());
        assert!(matches!(
            check_owner(&item, 8),
            Err(ApiError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn duplicate_save_returns_409_with_the_existing_record() {
        let existing = saved_item(10, 7);
        let err = ApiError::Duplicate(serde_json::to_value(&existing).unwrap());
        let response = err.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::CONFLICT);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "duplicate");
        assert_eq!(body["item"]["id"], 10);
        assert_eq!(body["item"]["title"], "A Sunday on La Grande Jatte");
    }

    #[test]
    fn create_request_accepts_type_alias() {
        let req: CreateItemRequest = serde_json::from_value(json!({
            "category": "food",
            "type": "meal",
            "title": "Pad Thai"
        }))
        .unwrap();
        assert_eq!(req.content_type, "meal");
    }
}
