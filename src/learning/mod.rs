mod edit;
mod list;
mod page;
pub mod store;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list::articles).post(edit::create))
        .route("/new", get(edit::new_page))
        .route("/{id}", get(page::article).post(edit::update))
        .route("/{id}/edit", get(edit::edit_page))
        .route("/{id}/delete", post(edit::delete))
}
