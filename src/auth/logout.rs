use axum::debug_handler;

use crate::{
    outcome::{ActionResult, Done, OrProvider, SIGN_IN_PATH},
    session::Viewer,
};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn logout(viewer: Viewer) -> ActionResult {
    viewer.sign_out().await.or_provider("ログアウトに失敗しました")?;
    Ok(Done::new().redirect(SIGN_IN_PATH))
}
