use axum::{debug_handler, extract::{Path, State}, response::Response};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    include_res,
    policy::{Capabilities, Target},
    res::{self, escape, fill},
    session::Viewer,
    AppResult,
};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn article(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
) -> AppResult<Response> {
    let Some(article) = super::store::get(&db_pool, id).await? else {
        return res::sorry(&viewer, "記事");
    };

    let caps = Capabilities::for_target(viewer.actor(), Target::from(&article));

    let mut actions = String::new();
    if caps.edit {
        actions += &format!(r#"<a class="button" href="/learning/{id}/edit">編集</a>"#);
    }
    if caps.delete {
        actions += &format!(
            r#"<form method="post" action="/learning/{id}/delete" data-action data-confirm="この記事を削除しますか？"><button class="danger">削除</button></form>"#
        );
    }

    let content = fill(
        include_res!(str, "/pages/learning/article.html"),
        &[
            ("title", escape(&article.title).as_str()),
            ("image", res::image_tag(article.image_url.as_deref(), &article.title).as_str()),
            ("body", res::markdown(&article.content).as_str()),
            ("author_id", article.author_id.to_string().as_str()),
            ("author", escape(article.author_name.as_deref().unwrap_or("退会済みユーザー")).as_str()),
            ("date", res::format_date(article.created_at).as_str()),
            ("actions", actions.as_str()),
        ],
    );
    Ok(res::page(&viewer, &article.title, &content))
}
