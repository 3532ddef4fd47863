use axum::{debug_handler, extract::{Path, State}, response::Response};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    include_res,
    policy::{self, Action, Target},
    res::{self, escape, fill},
    session::Viewer,
    AppResult,
};

/// Public profile: display name, bio and photo. Role and preferences only
/// show up for the owner.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn profile(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
) -> AppResult<Response> {
    let Some(profile) = super::store::get(&db_pool, id).await? else {
        return res::sorry(&viewer, "ユーザー");
    };

    let photo = match profile.profile_photo.as_deref() {
        Some(url) => format!(r#"<img class="avatar" src="{}" alt="">"#, escape(url)),
        None => String::new(),
    };

    let private = if policy::can(viewer.actor(), Action::ViewPrivate, Target::from(&profile)) {
        format!(
            r#"<p class="private">権限: {} ・ 文字サイズ: {} ・ <a href="/settings">設定を変更</a></p>"#,
            profile.role.label(),
            profile.font_size.label(),
        )
    } else {
        String::new()
    };

    let content = fill(
        include_res!(str, "/pages/user.html"),
        &[
            ("photo", photo.as_str()),
            ("name", escape(&profile.display_name).as_str()),
            ("bio", escape(&profile.bio).as_str()),
            ("private", private.as_str()),
        ],
    );
    Ok(res::page(&viewer, &profile.display_name, &content))
}
