use axum::{debug_handler, extract::Query, response::{IntoResponse, Redirect, Response}};
use serde::Deserialize;

use crate::{forms, include_res, res, session::Viewer, AppResult};

#[derive(Deserialize)]
pub(crate) struct AuthQuery {
    pub(crate) return_url: Option<String>,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn auth_page(
    viewer: Viewer,
    Query(AuthQuery { return_url }): Query<AuthQuery>,
) -> AppResult<Response> {
    if viewer.actor().is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    if let Some(path) = return_url.as_deref().and_then(forms::local_path) {
        viewer.remember_return_url(&path).await?;
    }

    Ok(res::page(&viewer, "ログイン", include_res!(str, "/pages/auth.html")))
}
