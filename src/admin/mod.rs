mod page;
pub mod role;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(page::admin))
        .route("/role", post(role::update_role))
}
