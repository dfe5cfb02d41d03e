use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::jwt::AuthUser,
    error::ApiError,
    shopping::{
        dto::{
            AddItemRequest, ClearCheckedQuery, ClearedResponse, DeletedResponse, GroupedList,
            ItemResponse, ListResponse,
        },
        repo::{self, ShoppingListItem},
    },
    state::AppState,
};

pub fn shopping_routes() -> Router<AppState> {
    Router::new()
        .route("/api/shopping", get(get_list).post(add_item))
        .route("/api/shopping/clear-checked", delete(clear_checked))
        .route("/api/shopping/:id/toggle", put(toggle_item))
        .route("/api/shopping/:id", delete(delete_item))
}

#[instrument(skip(state))]
pub async fn get_list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ListResponse>, ApiError> {
    let items = repo::list_by_user(&state.db, user_id).await?;
    Ok(Json(ListResponse {
        success: true,
        list: GroupedList::from_items(items),
    }))
}

#[instrument(skip(state, payload))]
pub async fn add_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    let name = payload.name.trim();
    let measure = payload.measure.trim();
    let section = payload.section.as_str();

    if name.is_empty() {
        return Err(ApiError::MissingFields("name is required"));
    }

    // "Milk" then "milk" yields the same row both times.
    if let Some(existing) = repo::find_by_name(&state.db, user_id, section, name).await? {
        return Ok((
            StatusCode::OK,
            Json(ItemResponse {
                success: true,
                item: existing,
                duplicate: true,
            }),
        ));
    }

    let item = match repo::insert(&state.db, user_id, section, name, measure).await {
        Ok(item) => item,
        // Concurrent adds of the same name can slip past the soft lookup;
        // the unique index wins and we return the row that got there first.
        Err(e) if crate::auth::repo::is_unique_violation(&e) => {
            let existing = repo::find_by_name(&state.db, user_id, section, name)
                .await?
                .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("dedupe race lost twice")))?;
            return Ok((
                StatusCode::OK,
                Json(ItemResponse {
                    success: true,
                    item: existing,
                    duplicate: true,
                }),
            ));
        }
        Err(e) => return Err(ApiError::Internal(e.into())),
    };

    info!(user_id = %user_id, item_id = %item.id, section, "shopping item added");
    Ok((
        StatusCode::CREATED,
        Json(ItemResponse {
            success: true,
            item,
            duplicate: false,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn toggle_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(item_id): Path<i64>,
) -> Result<Json<ItemResponse>, ApiError> {
    owned_item(&state, item_id, user_id).await?;
    let item = repo::toggle(&state.db, item_id).await?;
    Ok(Json(ItemResponse {
        success: true,
        item,
        duplicate: false,
    }))
}

#[instrument(skip(state))]
pub async fn delete_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(item_id): Path<i64>,
) -> Result<Json<DeletedResponse>, ApiError> {
    owned_item(&state, item_id, user_id).await?;
    repo::delete(&state.db, item_id).await?;
    info!(user_id = %user_id, item_id = %item_id, "shopping item deleted");
    Ok(Json(DeletedResponse {
        success: true,
        message: "Item removed from the list",
    }))
}

#[instrument(skip(state))]
pub async fn clear_checked(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<ClearCheckedQuery>,
) -> Result<Json<ClearedResponse>, ApiError> {
    let removed =
        repo::clear_checked(&state.db, user_id, q.section.map(|s| s.as_str())).await?;
    info!(user_id = %user_id, removed, "checked items cleared");
    Ok(Json(ClearedResponse {
        success: true,
        removed,
    }))
}

async fn owned_item(
    state: &AppState,
    item_id: i64,
    caller: i64,
) -> Result<ShoppingListItem, ApiError> {
    let item = repo::find_by_id(&state.db, item_id)
        .await?
        .ok_or(ApiError::NotFound("item"))?;
    check_owner(&item, caller)?;
    Ok(item)
}

pub(crate) fn check_owner(item: &ShoppingListItem, caller: i64) -> Result<(), ApiError> {
    if item.user_id != caller {
        warn!(item_id = %item.id, owner = %item.user_id, caller = %caller, "ownership violation");
        return Err(ApiError::Unauthorized);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    #[test]
    fn only_the_owner_may_touch_a_list_item() {
        let item = ShoppingListItem {
            id: 3,
            user_id: 7,
            section: "food".into(),
            name: "Milk".into(),
            measure: "1l".into(),
            checked: false,
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        assert!(check_owner(&item, 7).is_ok());
        assert!(matches!(check_owner(&item, 8), Err(ApiError::Unauthorized)));
    }
}
