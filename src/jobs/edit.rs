use axum::{debug_handler, extract::{Path, State}, response::Response, Form};
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    db::Listing,
    forms, include_res,
    outcome::{ActionError, ActionResult, Done, OrProvider},
    policy::{self, Action, Target},
    res::{self, escape, fill},
    session::Viewer,
    AppResult,
};

use super::store::{self, ListingFields};

#[derive(Deserialize)]
pub(crate) struct ListingForm {
    #[serde(default)]
    title: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    salary: String,
    #[serde(default)]
    description: String,
    image_url: Option<String>,
}

impl ListingForm {
    fn validate(self) -> Result<ListingFields, ActionError> {
        const MISSING: &str = "必須項目が未入力です";
        Ok(ListingFields {
            title: forms::required(&self.title, MISSING)?,
            location: forms::required(&self.location, MISSING)?,
            salary: forms::required(&self.salary, MISSING)?,
            description: self.description.trim().to_owned(),
            image_url: forms::image_url(self.image_url.as_deref())?,
        })
    }
}

fn form_page(viewer: &Viewer, heading: &str, action: &str, listing: Option<&Listing>) -> Response {
    let (title, location, salary, description, image_url) = match listing {
        Some(l) => (
            escape(&l.title),
            escape(&l.location),
            escape(&l.salary),
            escape(&l.description),
            escape(l.image_url.as_deref().unwrap_or_default()),
        ),
        None => Default::default(),
    };

    let content = fill(
        include_res!(str, "/pages/jobs/form.html"),
        &[
            ("heading", heading),
            ("action", action),
            ("title", title.as_str()),
            ("location", location.as_str()),
            ("salary", salary.as_str()),
            ("description", description.as_str()),
            ("image_url", image_url.as_str()),
        ],
    );
    res::page(viewer, heading, &content)
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn new_page(viewer: Viewer) -> AppResult<Response> {
    // the owner is whoever ends up creating it
    let target = Target::Listing { owner: Uuid::nil() };
    if let Some(denied) = res::deny_page(&viewer, Action::Create, target, "/jobs/new", "ページ") {
        return denied;
    }
    Ok(form_page(&viewer, "求人を掲載する", "/jobs", None))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn create(
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
    Form(form): Form<ListingForm>,
) -> ActionResult {
    let actor = viewer.require()?;
    policy::authorize(Some(actor), Action::Create, Target::Listing { owner: actor.id })?;
    let fields = form.validate()?;

    let id = store::insert(&db_pool, actor.id, fields)
        .await
        .or_provider("求人の作成に失敗しました")?;

    tracing::info!(%id, owner = %actor.id, "listing created");
    Ok(Done::new().redirect("/jobs"))
}

async fn load(db_pool: &SqlitePool, id: Uuid) -> Result<Listing, ActionError> {
    store::get(db_pool, id)
        .await
        .or_provider("求人の取得に失敗しました")?
        .ok_or(ActionError::NotFound("求人"))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn edit_page(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
) -> AppResult<Response> {
    let Some(listing) = store::get(&db_pool, id).await? else {
        return res::sorry(&viewer, "求人");
    };
    let here = format!("/jobs/{id}/edit");
    if let Some(denied) = res::deny_page(&viewer, Action::Edit, Target::from(&listing), &here, "求人") {
        return denied;
    }
    Ok(form_page(&viewer, "求人を編集する", &format!("/jobs/{id}"), Some(&listing)))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn update(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
    Form(form): Form<ListingForm>,
) -> ActionResult {
    let actor = viewer.require()?;
    let listing = load(&db_pool, id).await?;
    policy::authorize(Some(actor), Action::Edit, Target::from(&listing))?;
    let fields = form.validate()?;

    if !store::update(&db_pool, id, fields).await.or_provider("更新に失敗しました")? {
        return Err(ActionError::NotFound("求人"));
    }

    tracing::info!(%id, by = %actor.id, "listing updated");
    Ok(Done::new().redirect(format!("/jobs/{id}")))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn delete(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
) -> ActionResult {
    let actor = viewer.require()?;
    let listing = load(&db_pool, id).await?;
    policy::authorize(Some(actor), Action::Delete, Target::from(&listing))?;

    store::delete(&db_pool, id).await.or_provider("削除に失敗しました")?;

    tracing::info!(%id, by = %actor.id, "listing deleted");
    Ok(Done::new().redirect("/jobs"))
}
