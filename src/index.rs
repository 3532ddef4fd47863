use axum::{debug_handler, extract::State, response::Response};
use sqlx::SqlitePool;

use crate::{include_res, jobs, res::{self, fill}, session::Viewer, AppResult};

const LATEST_LISTINGS: i64 = 3;

#[debug_handler(state = crate::AppState)]
pub async fn index(
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
) -> AppResult<Response> {
    let latest = jobs::store::latest(&db_pool, LATEST_LISTINGS).await?;

    let content = fill(
        include_res!(str, "/pages/index.html"),
        &[("cards", jobs::list::listing_cards(&latest).as_str())],
    );
    Ok(res::page(&viewer, "発掘ジョブ", &content))
}
