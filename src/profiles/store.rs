use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::{FontSize, Profile, Role};

/// A row of the admin directory.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DirectoryEntry {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct ProfileFields {
    pub display_name: String,
    pub bio: String,
    pub profile_photo: Option<String>,
}

pub async fn get(db_pool: &SqlitePool, id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM profiles WHERE id = ?")
        .bind(id)
        .fetch_optional(db_pool)
        .await
}

pub async fn directory(db_pool: &SqlitePool) -> Result<Vec<DirectoryEntry>, sqlx::Error> {
    sqlx::query_as(
        "SELECT p.id, i.email, p.display_name, p.role, p.updated_at
         FROM profiles p JOIN identities i ON i.id = p.id
         ORDER BY i.created_at ASC",
    )
    .fetch_all(db_pool)
    .await
}

/// A `None` photo keeps the stored one.
pub async fn update(db_pool: &SqlitePool, id: Uuid, fields: ProfileFields) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE profiles SET display_name = ?, bio = ?, profile_photo = COALESCE(?, profile_photo), updated_at = ? WHERE id = ?",
    )
    .bind(fields.display_name)
    .bind(fields.bio)
    .bind(fields.profile_photo)
    .bind(OffsetDateTime::now_utc())
    .bind(id)
    .execute(db_pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn update_font_size(db_pool: &SqlitePool, id: Uuid, font_size: FontSize) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE profiles SET font_size = ?, updated_at = ? WHERE id = ?")
        .bind(font_size)
        .bind(OffsetDateTime::now_utc())
        .bind(id)
        .execute(db_pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn update_role<'e, E: SqliteExecutor<'e>>(db: E, id: Uuid, role: Role) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE profiles SET role = ?, updated_at = ? WHERE id = ?")
        .bind(role)
        .bind(OffsetDateTime::now_utc())
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn delete<'e, E: SqliteExecutor<'e>>(db: E, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM profiles WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}
