use axum::{debug_handler, extract::{Path, State}, response::Response, Form};
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    db::Article,
    forms, include_res,
    outcome::{ActionError, ActionResult, Done, OrProvider},
    policy::{self, Action, Target},
    res::{self, escape, fill},
    session::Viewer,
    AppResult,
};

use super::store::{self, ArticleFields};

#[derive(Deserialize)]
pub(crate) struct ArticleForm {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    image_url: Option<String>,
}

impl ArticleForm {
    fn validate(self) -> Result<ArticleFields, ActionError> {
        const MISSING: &str = "タイトルと本文は必須です";
        Ok(ArticleFields {
            title: forms::required(&self.title, MISSING)?,
            content: forms::required(&self.content, MISSING)?,
            image_url: forms::image_url(self.image_url.as_deref())?,
        })
    }
}

fn form_page(viewer: &Viewer, heading: &str, action: &str, article: Option<&Article>) -> Response {
    let (title, content, image_url) = match article {
        Some(a) => (
            escape(&a.title),
            escape(&a.content),
            escape(a.image_url.as_deref().unwrap_or_default()),
        ),
        None => Default::default(),
    };

    let page = fill(
        include_res!(str, "/pages/learning/form.html"),
        &[
            ("heading", heading),
            ("action", action),
            ("title", title.as_str()),
            ("content", content.as_str()),
            ("image_url", image_url.as_str()),
        ],
    );
    res::page(viewer, heading, &page)
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn new_page(viewer: Viewer) -> AppResult<Response> {
    let target = Target::Article { owner: Uuid::nil() };
    if let Some(denied) = res::deny_page(&viewer, Action::Create, target, "/learning/new", "ページ") {
        return denied;
    }
    Ok(form_page(&viewer, "記事を書く", "/learning", None))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn create(
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
    Form(form): Form<ArticleForm>,
) -> ActionResult {
    let actor = viewer.require()?;
    policy::authorize(Some(actor), Action::Create, Target::Article { owner: actor.id })?;
    let fields = form.validate()?;

    let id = store::insert(&db_pool, actor.id, fields)
        .await
        .or_provider("記事の作成に失敗しました")?;

    tracing::info!(%id, author = %actor.id, "article created");
    Ok(Done::new().redirect("/learning"))
}

async fn load(db_pool: &SqlitePool, id: Uuid) -> Result<Article, ActionError> {
    store::get(db_pool, id)
        .await
        .or_provider("記事の取得に失敗しました")?
        .ok_or(ActionError::NotFound("記事"))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn edit_page(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
) -> AppResult<Response> {
    let Some(article) = store::get(&db_pool, id).await? else {
        return res::sorry(&viewer, "記事");
    };
    let here = format!("/learning/{id}/edit");
    if let Some(denied) = res::deny_page(&viewer, Action::Edit, Target::from(&article), &here, "記事") {
        return denied;
    }
    Ok(form_page(&viewer, "記事を編集する", &format!("/learning/{id}"), Some(&article)))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn update(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
    Form(form): Form<ArticleForm>,
) -> ActionResult {
    let actor = viewer.require()?;
    let article = load(&db_pool, id).await?;
    policy::authorize(Some(actor), Action::Edit, Target::from(&article))?;
    let fields = form.validate()?;

    if !store::update(&db_pool, id, fields).await.or_provider("更新に失敗しました")? {
        return Err(ActionError::NotFound("記事"));
    }

    tracing::info!(%id, by = %actor.id, "article updated");
    Ok(Done::new().redirect(format!("/learning/{id}")))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn delete(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
) -> ActionResult {
    let actor = viewer.require()?;
    let article = load(&db_pool, id).await?;
    policy::authorize(Some(actor), Action::Delete, Target::from(&article))?;

    store::delete(&db_pool, id).await.or_provider("削除に失敗しました")?;

    tracing::info!(%id, by = %actor.id, "article deleted");
    Ok(Done::new().redirect("/learning"))
}
