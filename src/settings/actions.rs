use axum::{debug_handler, extract::State, Form};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    accounts,
    db::FontSize,
    forms,
    identity::{IdentityError, Identities},
    outcome::{ActionError, ActionResult, Done, OrProvider, SIGN_IN_PATH},
    policy::{self, Action, Target},
    profiles::store::{self, ProfileFields},
    session::Viewer,
};

#[derive(Deserialize)]
pub(crate) struct ProfileForm {
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    bio: String,
    profile_photo: Option<String>,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn update_profile(
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
    Form(form): Form<ProfileForm>,
) -> ActionResult {
    let actor = viewer.require()?;
    policy::authorize(Some(actor), Action::Edit, Target::Profile { id: actor.id })?;

    let fields = ProfileFields {
        display_name: forms::required(&form.display_name, "表示名を入力してください")?,
        bio: form.bio.trim().to_owned(),
        profile_photo: forms::image_url(form.profile_photo.as_deref())?,
    };

    store::update(&db_pool, actor.id, fields)
        .await
        .or_provider("プロフィール更新に失敗しました")?;
    Ok(Done::new().message("プロフィールを更新しました"))
}

#[derive(Deserialize)]
pub(crate) struct PasswordForm {
    #[serde(default)]
    new_password: String,
    #[serde(default)]
    confirm_password: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn update_password(
    State(identities): State<Identities>,
    viewer: Viewer,
    Form(form): Form<PasswordForm>,
) -> ActionResult {
    let actor = viewer.require()?;
    let password = forms::new_password(&form.new_password, &form.confirm_password)?;

    identities
        .update_password(actor.id, &password)
        .await
        .or_provider("パスワード更新に失敗しました")?;

    tracing::info!(id = %actor.id, "password changed");
    Ok(Done::new().message("パスワードを更新しました"))
}

#[derive(Deserialize)]
pub(crate) struct EmailForm {
    #[serde(default)]
    new_email: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn update_email(
    State(identities): State<Identities>,
    viewer: Viewer,
    Form(form): Form<EmailForm>,
) -> ActionResult {
    let actor = viewer.require()?;

    let requested = form.new_email.trim().to_lowercase();
    if requested.is_empty() || Some(requested.as_str()) == viewer.email() {
        return Err(ActionError::invalid("新しいメールアドレスを入力してください"));
    }
    let email = forms::email(&requested)?;

    match identities.update_email(actor.id, &email).await {
        Ok(()) => {
            tracing::info!(id = %actor.id, "email changed");
            Ok(Done::new().message("メールアドレスを更新しました"))
        }
        Err(IdentityError::EmailTaken) => Err(ActionError::invalid("このメールアドレスは既に登録されています")),
        Err(err) => Err(err).or_provider("メール更新に失敗しました"),
    }
}

#[derive(Deserialize)]
pub(crate) struct FontSizeForm {
    #[serde(default)]
    font_size: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn update_font_size(
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
    Form(form): Form<FontSizeForm>,
) -> ActionResult {
    let actor = viewer.require()?;
    let font_size: FontSize = form
        .font_size
        .parse()
        .map_err(|_| ActionError::invalid("無効なフォントサイズです"))?;

    store::update_font_size(&db_pool, actor.id, font_size)
        .await
        .or_provider("フォントサイズ更新に失敗しました")?;
    Ok(Done::new().message("フォントサイズを更新しました"))
}

/// Ends the session whatever happens to the deletion. A deletion that could
/// not finish stays recorded and is completed by `resume-deletions`.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn delete_account(
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
) -> ActionResult {
    let actor = *viewer.require()?;

    let deleted = accounts::delete_account(&db_pool, actor.id).await;

    if let Err(err) = viewer.sign_out().await {
        tracing::warn!(id = %actor.id, error = %err, "could not flush session after account deletion");
    }

    match deleted {
        Ok(how) => tracing::info!(id = %actor.id, ?how, "account deletion finished"),
        Err(err) => tracing::error!(id = %actor.id, error = ?err, "account deletion left pending"),
    }
    Ok(Done::new().redirect(SIGN_IN_PATH))
}
