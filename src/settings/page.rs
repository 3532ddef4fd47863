use axum::{debug_handler, response::Response};
use uuid::Uuid;

use crate::{
    db::FontSize,
    include_res,
    policy::{Action, Target},
    res::{self, escape, fill},
    session::Viewer,
    AppResult,
};

fn font_size_options(current: FontSize) -> String {
    FontSize::ALL
        .into_iter()
        .map(|size| {
            let selected = if size == current { " selected" } else { "" };
            format!(r#"<option value="{}"{selected}>{}</option>"#, size.as_str(), size.label())
        })
        .collect()
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn settings(viewer: Viewer) -> AppResult<Response> {
    let id = viewer.actor().map(|actor| actor.id).unwrap_or(Uuid::nil());
    if let Some(denied) = res::deny_page(&viewer, Action::ViewPrivate, Target::Profile { id }, "/settings", "ページ") {
        return denied;
    }
    let Some(profile) = viewer.profile() else {
        return res::sorry(&viewer, "ページ");
    };

    let content = fill(
        include_res!(str, "/pages/settings.html"),
        &[
            ("display_name", escape(&profile.display_name).as_str()),
            ("bio", escape(&profile.bio).as_str()),
            ("profile_photo", escape(profile.profile_photo.as_deref().unwrap_or_default()).as_str()),
            ("email", escape(viewer.email().unwrap_or_default()).as_str()),
            ("role", profile.role.label()),
            ("font_sizes", font_size_options(profile.font_size).as_str()),
        ],
    );
    Ok(res::page(&viewer, "設定", &content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_font_size_is_preselected() {
        let options = font_size_options(FontSize::Large);
        assert!(options.contains(r#"<option value="large" selected>大</option>"#));
        assert!(options.contains(r#"<option value="small">小</option>"#));
    }
}
