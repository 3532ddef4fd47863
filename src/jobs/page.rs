use axum::{debug_handler, extract::{Path, State}, response::Response};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    applications::{self, Applicant},
    include_res,
    policy::{Capabilities, Target},
    res::{self, escape, fill},
    session::Viewer,
    AppResult,
};

pub(crate) fn applicant_rows(applicants: &[Applicant]) -> String {
    if applicants.is_empty() {
        return r#"<p class="empty">まだ応募はありません</p>"#.to_owned();
    }

    let rows: String = applicants
        .iter()
        .map(|a| {
            format!(
                r#"<li><a href="/users/{}">{}</a> <span class="status">{}</span> <span class="date">{}</span></li>"#,
                a.applicant_id,
                escape(a.display_name.as_deref().unwrap_or("退会済みユーザー")),
                a.status.label(),
                res::format_date(a.created_at),
            )
        })
        .collect();
    format!(r#"<ul class="applicants">{rows}</ul>"#)
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn job(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
) -> AppResult<Response> {
    let Some(listing) = super::store::get(&db_pool, id).await? else {
        return res::sorry(&viewer, "求人");
    };

    let caps = Capabilities::for_target(viewer.actor(), Target::from(&listing));

    let mut actions = String::new();
    if caps.edit {
        actions += &format!(r#"<a class="button" href="/jobs/{id}/edit">編集</a>"#);
    }
    if caps.delete {
        actions += &format!(
            r#"<form method="post" action="/jobs/{id}/delete" data-action data-confirm="この求人を削除しますか？"><button class="danger">削除</button></form>"#
        );
    }

    let applied = match viewer.actor() {
        Some(actor) => applications::has_applied(&db_pool, id, actor.id).await?,
        None => false,
    };

    let apply = match viewer.actor() {
        None => format!(r#"<a class="button" href="/auth?return_url=/jobs/{id}">ログインして応募する</a>"#),
        Some(_) if applied => r#"<button disabled>応募済み</button>"#.to_owned(),
        Some(_) if caps.apply => format!(
            r#"<form method="post" action="/jobs/{id}/apply" data-action><button>この求人に応募する</button><p class="form-error"></p><p class="form-message"></p></form>"#
        ),
        Some(_) => String::new(),
    };

    let applicants = if caps.view_applicants {
        let list = applications::for_listing(&db_pool, id).await?;
        format!(r#"<section><h2>応募者一覧</h2>{}</section>"#, applicant_rows(&list))
    } else {
        String::new()
    };

    let content = fill(
        include_res!(str, "/pages/jobs/job.html"),
        &[
            ("title", escape(&listing.title).as_str()),
            ("image", res::image_tag(listing.image_url.as_deref(), &listing.title).as_str()),
            ("location", escape(&listing.location).as_str()),
            ("salary", escape(&listing.salary).as_str()),
            ("description", escape(&listing.description).as_str()),
            ("owner_id", listing.created_by.to_string().as_str()),
            ("owner", escape(listing.owner_name.as_deref().unwrap_or("退会済みユーザー")).as_str()),
            ("date", res::format_date(listing.created_at).as_str()),
            ("actions", actions.as_str()),
            ("apply", apply.as_str()),
            ("applicants", applicants.as_str()),
        ],
    );
    Ok(res::page(&viewer, &listing.title, &content))
}
