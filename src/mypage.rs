use axum::{debug_handler, extract::State, response::Response};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    applications::{self, SentApplication},
    include_res,
    jobs::{list::listing_card, page::applicant_rows, store},
    policy::{self, Action, Target},
    res::{self, escape, fill},
    session::Viewer,
    AppResult,
};

fn sent_rows(sent: &[SentApplication]) -> String {
    if sent.is_empty() {
        return r#"<p class="empty">まだ応募していません</p>"#.to_owned();
    }

    let rows: String = sent
        .iter()
        .map(|a| {
            format!(
                r#"<li><a href="/jobs/{}">{}</a> <span class="location">{}</span> <span class="status">{}</span> <span class="date">{}</span></li>"#,
                a.job_id,
                escape(&a.job_title),
                escape(&a.job_location),
                a.status.label(),
                res::format_date(a.created_at),
            )
        })
        .collect();
    format!(r#"<ul class="applications">{rows}</ul>"#)
}

#[debug_handler(state = crate::AppState)]
pub async fn mypage(
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
) -> AppResult<Response> {
    let id = viewer.actor().map(|actor| actor.id).unwrap_or(Uuid::nil());
    if let Some(denied) = res::deny_page(&viewer, Action::ViewPrivate, Target::Profile { id }, "/mypage", "ページ") {
        return denied;
    }
    let Some(actor) = viewer.actor() else {
        return res::sorry(&viewer, "ページ");
    };

    let sent = applications::for_applicant(&db_pool, actor.id).await?;

    let listings = if policy::can(Some(actor), Action::ViewOwnListings, Target::Profile { id: actor.id }) {
        let mine = store::by_owner(&db_pool, actor.id).await?;
        let received = applications::for_owner(&db_pool, actor.id).await?;

        let sections: String = if mine.is_empty() {
            r#"<p class="empty">掲載中の求人はありません</p>"#.to_owned()
        } else {
            mine.iter()
                .map(|listing| {
                    let theirs: Vec<_> = received.iter().filter(|a| a.job_id == listing.id).cloned().collect();
                    format!(r#"<div class="mine">{}{}</div>"#, listing_card(listing), applicant_rows(&theirs))
                })
                .collect()
        };
        format!(r#"<section><h2>掲載した求人</h2><a class="button" href="/jobs/new">求人を掲載する</a>{sections}</section>"#)
    } else {
        String::new()
    };

    let name = viewer.profile().map(|p| p.display_name.as_str()).unwrap_or_default();
    let content = fill(
        include_res!(str, "/pages/mypage.html"),
        &[
            ("id", actor.id.to_string().as_str()),
            ("name", escape(name).as_str()),
            ("applications", sent_rows(&sent).as_str()),
            ("listings", listings.as_str()),
        ],
    );
    Ok(res::page(&viewer, "マイページ", &content))
}
