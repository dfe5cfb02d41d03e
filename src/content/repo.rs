use serde::{Deserialize, Serialize, Serializer};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SavedItem {
    pub id: i64,
    pub user_id: i64,
    pub category: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub external_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub user_notes: String,
    #[serde(serialize_with = "metadata_or_empty")]
    pub metadata: Option<serde_json::Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

// Callers always get an object back, never null.
fn metadata_or_empty<S: Serializer>(
    m: &Option<serde_json::Value>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match m {
        Some(v) => v.serialize(s),
        None => serde_json::Value::Object(serde_json::Map::new()).serialize(s),
    }
}

const ITEM_COLUMNS: &str = "id, user_id, category, content_type, external_id, title, description, user_notes, metadata, created_at, updated_at";

pub struct NewSavedItem<'a> {
    pub user_id: i64,
    pub category: &'a str,
    pub content_type: &'a str,
    pub external_id: Option<&'a str>,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub user_notes: &'a str,
    pub metadata: Option<&'a serde_json::Value>,
}

pub async fn find_duplicate(
    db: &PgPool,
    user_id: i64,
    external_id: &str,
    content_type: &str,
) -> anyhow::Result<Option<SavedItem>> {
    let item = sqlx::query_as::<_, SavedItem>(&format!(
        r#"
        SELECT {ITEM_COLUMNS} FROM saved_items
        WHERE user_id = $1 AND external_id = $2 AND content_type = $3
        "#
    ))
    .bind(user_id)
    .bind(external_id)
    .bind(content_type)
    .fetch_optional(db)
    .await?;
    Ok(item)
}

pub async fn insert(db: &PgPool, new: NewSavedItem<'_>) -> Result<SavedItem, sqlx::Error> {
    sqlx::query_as::<_, SavedItem>(&format!(
        r#"
        INSERT INTO saved_items
            (user_id, category, content_type, external_id, title, description, user_notes, metadata)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {ITEM_COLUMNS}
        "#
    ))
    .bind(new.user_id)
    .bind(new.category)
    .bind(new.content_type)
    .bind(new.external_id)
    .bind(new.title)
    .bind(new.description)
    .bind(new.user_notes)
    .bind(new.metadata)
    .fetch_one(db)
    .await
}

pub async fn count_by_user(
    db: &PgPool,
    user_id: i64,
    content_type: Option<&str>,
) -> anyhow::Result<i64> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM saved_items
        WHERE user_id = $1 AND ($2::text IS NULL OR content_type = $2)
        "#,
    )
    .bind(user_id)
    .bind(content_type)
    .fetch_one(db)
    .await?;
    Ok(count)
}

pub async fn list_page(
    db: &PgPool,
    user_id: i64,
    content_type: Option<&str>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<SavedItem>> {
    let rows = sqlx::query_as::<_, SavedItem>(&format!(
        r#"
        SELECT {ITEM_COLUMNS} FROM saved_items
        WHERE user_id = $1 AND ($2::text IS NULL OR content_type = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#
    ))
    .bind(user_id)
    .bind(content_type)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find_by_id(db: &PgPool, id: i64) -> anyhow::Result<Option<SavedItem>> {
    let item = sqlx::query_as::<_, SavedItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM saved_items WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(item)
}

pub async fn update(
    db: &PgPool,
    id: i64,
    user_notes: &str,
    metadata: Option<&serde_json::Value>,
) -> anyhow::Result<SavedItem> {
    let item = sqlx::query_as::<_, SavedItem>(&format!(
        r#"
        UPDATE saved_items
        SET user_notes = $2, metadata = $3, updated_at = now()
        WHERE id = $1
        RETURNING {ITEM_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(user_notes)
    .bind(metadata)
    .fetch_one(db)
    .await?;
    Ok(item)
}

pub async fn delete(db: &PgPool, id: i64) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM saved_items WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

/// Per-content-type counts for the caller, raw; the handler maps them into
/// the fixed dashboard buckets.
pub async fn counts_by_content_type(
    db: &PgPool,
    user_id: i64,
) -> anyhow::Result<Vec<(String, i64)>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT content_type, COUNT(*) FROM saved_items
        WHERE user_id = $1
        GROUP BY content_type
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
