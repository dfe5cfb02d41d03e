use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ShoppingListItem {
    pub id: i64,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub section: String,
    pub name: String,
    pub measure: String,
    pub checked: bool,
    #[serde(rename = "createdAt", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

const COLUMNS: &str = "id, user_id, section, name, measure, checked, created_at";

pub async fn list_by_user(db: &PgPool, user_id: i64) -> anyhow::Result<Vec<ShoppingListItem>> {
    let rows = sqlx::query_as::<_, ShoppingListItem>(&format!(
        r#"
        SELECT {COLUMNS} FROM shopping_list_items
        WHERE user_id = $1
        ORDER BY created_at ASC
        "#
    ))
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Case-insensitive lookup within (user, section); backs the soft dedupe on
/// insert.
pub async fn find_by_name(
    db: &PgPool,
    user_id: i64,
    section: &str,
    name: &str,
) -> anyhow::Result<Option<ShoppingListItem>> {
    let item = sqlx::query_as::<_, ShoppingListItem>(&format!(
        r#"
        SELECT {COLUMNS} FROM shopping_list_items
        WHERE user_id = $1 AND section = $2 AND lower(name) = lower($3)
        "#
    ))
    .bind(user_id)
    .bind(section)
    .bind(name)
    .fetch_optional(db)
    .await?;
    Ok(item)
}

pub async fn insert(
    db: &PgPool,
    user_id: i64,
    section: &str,
    name: &str,
    measure: &str,
) -> Result<ShoppingListItem, sqlx::Error> {
    sqlx::query_as::<_, ShoppingListItem>(&format!(
        r#"
        INSERT INTO shopping_list_items (user_id, section, name, measure)
        VALUES ($1, $2, $3, $4)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(section)
    .bind(name)
    .bind(measure)
    .fetch_one(db)
    .await
}

pub async fn find_by_id(db: &PgPool, id: i64) -> anyhow::Result<Option<ShoppingListItem>> {
    let item = sqlx::query_as::<_, ShoppingListItem>(&format!(
        "SELECT {COLUMNS} FROM shopping_list_items WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(item)
}

pub async fn toggle(db: &PgPool, id: i64) -> anyhow::Result<ShoppingListItem> {
    let item = sqlx::query_as::<_, ShoppingListItem>(&format!(
        r#"
        UPDATE shopping_list_items SET checked = NOT checked
        WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .fetch_one(db)
    .await?;
    Ok(item)
}

pub async fn delete(db: &PgPool, id: i64) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM shopping_list_items WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn clear_checked(
    db: &PgPool,
    user_id: i64,
    section: Option<&str>,
) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM shopping_list_items
        WHERE user_id = $1 AND checked AND ($2::text IS NULL OR section = $2)
        "#,
    )
    .bind(user_id)
    .bind(section)
    .execute(db)
    .await?;
    Ok(result.rows_affected())
}
