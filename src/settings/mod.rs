mod actions;
mod page;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(page::settings))
        .route("/profile", post(actions::update_profile))
        .route("/password", post(actions::update_password))
        .route("/email", post(actions::update_email))
        .route("/font-size", post(actions::update_font_size))
        .route("/delete-account", post(actions::delete_account))
}
