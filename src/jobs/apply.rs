use axum::{debug_handler, extract::{Path, State}};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    applications,
    outcome::{ActionResult, Done},
    session::Viewer,
};

#[debug_handler(state = crate::AppState)]
pub async fn apply(
    Path(job_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
) -> ActionResult {
    applications::submit(&db_pool, viewer.actor(), job_id).await?;
    Ok(Done::new().message("応募しました"))
}
