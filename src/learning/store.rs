use sqlx::{SqliteExecutor, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::Article;

const SELECT_ARTICLE: &str = "SELECT a.*, p.display_name AS author_name FROM articles a LEFT JOIN profiles p ON p.id = a.author_id";

#[derive(Debug, Clone)]
pub struct ArticleFields {
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
}

pub async fn all(db_pool: &SqlitePool) -> Result<Vec<Article>, sqlx::Error> {
    sqlx::query_as(&format!("{SELECT_ARTICLE} ORDER BY a.created_at DESC, a.id DESC"))
        .fetch_all(db_pool)
        .await
}

pub async fn get(db_pool: &SqlitePool, id: Uuid) -> Result<Option<Article>, sqlx::Error> {
    sqlx::query_as(&format!("{SELECT_ARTICLE} WHERE a.id = ?"))
        .bind(id)
        .fetch_optional(db_pool)
        .await
}

pub async fn insert(db_pool: &SqlitePool, author_id: Uuid, fields: ArticleFields) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::now_v7();
    let now = OffsetDateTime::now_utc();
    sqlx::query(
        "INSERT INTO articles (id, title, content, image_url, author_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(fields.title)
    .bind(fields.content)
    .bind(fields.image_url)
    .bind(author_id)
    .bind(now)
    .bind(now)
    .execute(db_pool)
    .await?;
    Ok(id)
}

pub async fn update(db_pool: &SqlitePool, id: Uuid, fields: ArticleFields) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE articles SET title = ?, content = ?, image_url = ?, updated_at = ? WHERE id = ?")
        .bind(fields.title)
        .bind(fields.content)
        .bind(fields.image_url)
        .bind(OffsetDateTime::now_utc())
        .bind(id)
        .execute(db_pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn delete(db_pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM articles WHERE id = ?")
        .bind(id)
        .execute(db_pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn delete_by_author<'e, E: SqliteExecutor<'e>>(db: E, author_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM articles WHERE author_id = ?")
        .bind(author_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}
