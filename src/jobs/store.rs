use sqlx::{SqliteExecutor, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::Listing;

const SELECT_LISTING: &str = "SELECT j.*, p.display_name AS owner_name FROM jobs j LEFT JOIN profiles p ON p.id = j.created_by";

/// Validated listing fields, shared by create and update.
#[derive(Debug, Clone)]
pub struct ListingFields {
    pub title: String,
    pub location: String,
    pub salary: String,
    pub description: String,
    pub image_url: Option<String>,
}

pub async fn latest(db_pool: &SqlitePool, limit: i64) -> Result<Vec<Listing>, sqlx::Error> {
    sqlx::query_as(&format!("{SELECT_LISTING} ORDER BY j.created_at DESC, j.id DESC LIMIT ?"))
        .bind(limit)
        .fetch_all(db_pool)
        .await
}

pub async fn all(db_pool: &SqlitePool) -> Result<Vec<Listing>, sqlx::Error> {
    sqlx::query_as(&format!("{SELECT_LISTING} ORDER BY j.created_at DESC, j.id DESC"))
        .fetch_all(db_pool)
        .await
}

pub async fn by_owner(db_pool: &SqlitePool, owner_id: Uuid) -> Result<Vec<Listing>, sqlx::Error> {
    sqlx::query_as(&format!("{SELECT_LISTING} WHERE j.created_by = ? ORDER BY j.created_at DESC, j.id DESC"))
        .bind(owner_id)
        .fetch_all(db_pool)
        .await
}

pub async fn get(db_pool: &SqlitePool, id: Uuid) -> Result<Option<Listing>, sqlx::Error> {
    sqlx::query_as(&format!("{SELECT_LISTING} WHERE j.id = ?"))
        .bind(id)
        .fetch_optional(db_pool)
        .await
}

pub async fn insert(db_pool: &SqlitePool, created_by: Uuid, fields: ListingFields) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::now_v7();
    let now = OffsetDateTime::now_utc();
    sqlx::query(
        "INSERT INTO jobs (id, title, location, salary, description, image_url, created_by, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(fields.title)
    .bind(fields.location)
    .bind(fields.salary)
    .bind(fields.description)
    .bind(fields.image_url)
    .bind(created_by)
    .bind(now)
    .bind(now)
    .execute(db_pool)
    .await?;
    Ok(id)
}

pub async fn update(db_pool: &SqlitePool, id: Uuid, fields: ListingFields) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE jobs SET title = ?, location = ?, salary = ?, description = ?, image_url = ?, updated_at = ? WHERE id = ?",
    )
    .bind(fields.title)
    .bind(fields.location)
    .bind(fields.salary)
    .bind(fields.description)
    .bind(fields.image_url)
    .bind(OffsetDateTime::now_utc())
    .bind(id)
    .execute(db_pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn delete(db_pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM jobs WHERE id = ?")
        .bind(id)
        .execute(db_pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Deletes every listing of `owner_id`; their applications go with them.
pub async fn delete_by_owner<'e, E: SqliteExecutor<'e>>(db: E, owner_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM jobs WHERE created_by = ?")
        .bind(owner_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}
