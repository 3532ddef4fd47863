use axum::{debug_handler, extract::State, Form};
use serde::Deserialize;

use crate::{
    identity::{IdentityError, Identities},
    outcome::{ActionError, ActionResult, Done, OrProvider},
    session::Viewer,
};

#[derive(Deserialize)]
pub(crate) struct LoginForm {
    email: String,
    password: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn login(
    State(identities): State<Identities>,
    viewer: Viewer,
    Form(LoginForm { email, password }): Form<LoginForm>,
) -> ActionResult {
    let email = email.trim().to_lowercase();
    if email.is_empty() || password.is_empty() {
        return Err(ActionError::invalid("メールアドレスとパスワードを入力してください"));
    }

    let identity = match identities.sign_in(&email, &password).await {
        Ok(identity) => identity,
        Err(IdentityError::InvalidCredentials) => {
            tracing::info!("password sign-in refused");
            return Err(ActionError::invalid(
                "ログイン失敗: メールアドレスまたはパスワードが正しくありません",
            ));
        }
        Err(err) => return Err(err).or_provider("ログインに失敗しました"),
    };

    tracing::info!(id = %identity.id, "signed in with password");
    let next = viewer.sign_in(identity.id).await.or_provider("ログインに失敗しました")?;
    Ok(Done::new().redirect(next))
}
