use axum::{debug_handler, extract::State, response::Response};
use sqlx::SqlitePool;

use crate::{
    db::Article,
    include_res,
    res::{self, escape, fill},
    session::Viewer,
    AppResult,
};

/// Plain-text teaser of a Markdown body.
fn excerpt(content: &str) -> String {
    const LEN: usize = 80;
    let flat: String = content
        .chars()
        .filter(|c| !matches!(c, '#' | '*' | '_' | '`' | '>'))
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    let flat = flat.trim();
    match flat.char_indices().nth(LEN) {
        Some((cut, _)) => format!("{}…", &flat[..cut]),
        None => flat.to_owned(),
    }
}

fn article_card(article: &Article) -> String {
    fill(
        include_res!(str, "/pages/learning/card.html"),
        &[
            ("id", article.id.to_string().as_str()),
            ("image", res::image_tag(article.image_url.as_deref(), &article.title).as_str()),
            ("title", escape(&article.title).as_str()),
            ("excerpt", escape(&excerpt(&article.content)).as_str()),
            ("author", escape(article.author_name.as_deref().unwrap_or("退会済みユーザー")).as_str()),
            ("date", res::format_date(article.created_at).as_str()),
        ],
    )
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn articles(
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
) -> AppResult<Response> {
    let articles = super::store::all(&db_pool).await?;

    let cards = if articles.is_empty() {
        r#"<p class="empty">記事はまだありません</p>"#.to_owned()
    } else {
        articles.iter().map(article_card).collect()
    };

    let content = fill(
        include_res!(str, "/pages/learning/list.html"),
        &[("cards", cards.as_str())],
    );
    Ok(res::page(&viewer, "ナレッジ", &content))
}
