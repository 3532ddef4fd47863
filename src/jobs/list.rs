use axum::{debug_handler, extract::State, response::Response};
use sqlx::SqlitePool;

use crate::{
    db::Listing,
    include_res,
    res::{self, escape, fill},
    session::Viewer,
    AppResult,
};

pub(crate) fn listing_card(listing: &Listing) -> String {
    fill(
        include_res!(str, "/pages/jobs/card.html"),
        &[
            ("id", listing.id.to_string().as_str()),
            ("image", res::image_tag(listing.image_url.as_deref(), &listing.title).as_str()),
            ("title", escape(&listing.title).as_str()),
            ("location", escape(&listing.location).as_str()),
            ("salary", escape(&listing.salary).as_str()),
            ("owner", escape(listing.owner_name.as_deref().unwrap_or("退会済みユーザー")).as_str()),
            ("date", res::format_date(listing.created_at).as_str()),
        ],
    )
}

pub(crate) fn listing_cards(listings: &[Listing]) -> String {
    if listings.is_empty() {
        return r#"<p class="empty">求人はまだありません</p>"#.to_owned();
    }
    listings.iter().map(listing_card).collect()
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn jobs(
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
) -> AppResult<Response> {
    let listings = super::store::all(&db_pool).await?;

    let content = fill(
        include_res!(str, "/pages/jobs/list.html"),
        &[("cards", listing_cards(&listings).as_str())],
    );
    Ok(res::page(&viewer, "求人一覧", &content))
}
