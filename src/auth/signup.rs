use axum::{debug_handler, extract::State, Form};
use serde::Deserialize;

use crate::{
    forms,
    identity::{IdentityError, Identities},
    outcome::{ActionError, ActionResult, Done, OrProvider},
    session::Viewer,
};

#[derive(Deserialize)]
pub(crate) struct SignupForm {
    email: String,
    password: String,
    confirm_password: String,
    display_name: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn signup(
    State(identities): State<Identities>,
    viewer: Viewer,
    Form(form): Form<SignupForm>,
) -> ActionResult {
    let password = forms::new_password(&form.password, &form.confirm_password)?;
    let email = forms::email(&form.email)?;
    let display_name = forms::required(&form.display_name, "表示名を入力してください")?;

    let identity = match identities.sign_up(&email, &password, &display_name).await {
        Ok(identity) => identity,
        Err(IdentityError::EmailTaken) => {
            return Err(ActionError::invalid("このメールアドレスは既に登録されています"));
        }
        Err(err) => return Err(err).or_provider("アカウント作成に失敗しました"),
    };

    let next = viewer.sign_in(identity.id).await.or_provider("アカウント作成に失敗しました")?;
    Ok(Done::new().redirect(next))
}
