use axum::{debug_handler, extract::State, response::Response};
use sqlx::SqlitePool;

use crate::{
    db::Role,
    include_res,
    policy::{Action, Target},
    profiles::store::{self, DirectoryEntry},
    res::{self, escape, fill},
    session::Viewer,
    AppResult,
};

fn role_cell(entry: &DirectoryEntry, is_self: bool) -> String {
    if is_self {
        return format!(
            r#"{} <span class="note">自分の権限は変更できません</span>"#,
            entry.role.label()
        );
    }

    let options: String = Role::ALL
        .into_iter()
        .map(|role| {
            let selected = if role == entry.role { " selected" } else { "" };
            format!(r#"<option value="{}"{selected}>{}</option>"#, role.as_str(), role.label())
        })
        .collect();
    format!(
        r#"<form method="post" action="/admin/role" data-action><input type="hidden" name="user_id" value="{}"><select name="role">{options}</select><button>変更</button><p class="form-error"></p><p class="form-message"></p></form>"#,
        entry.id
    )
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn admin(
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
) -> AppResult<Response> {
    if let Some(denied) = res::deny_page(&viewer, Action::ManageUsers, Target::Directory, "/admin", "ページ") {
        return denied;
    }
    let me = viewer.actor().map(|actor| actor.id);

    let rows: String = store::directory(&db_pool)
        .await?
        .iter()
        .map(|entry| {
            format!(
                r#"<tr><td><a href="/users/{}">{}</a></td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
                entry.id,
                escape(&entry.display_name),
                escape(&entry.email),
                role_cell(entry, Some(entry.id) == me),
                res::format_date(entry.updated_at),
            )
        })
        .collect();

    let content = fill(include_res!(str, "/pages/admin.html"), &[("rows", rows.as_str())]);
    Ok(res::page(&viewer, "ユーザー管理", &content))
}
