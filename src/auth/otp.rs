use axum::{debug_handler, extract::State, Form};
use serde::Deserialize;

use crate::{
    identity::{IdentityError, Identities},
    outcome::{ActionError, ActionResult, Done, OrProvider},
    session::Viewer,
};

const CODE_SENT: &str = "確認コードを送信しました";

#[derive(Deserialize)]
pub(crate) struct SendCodeForm {
    email: String,
}

#[derive(Deserialize)]
pub(crate) struct VerifyCodeForm {
    email: String,
    code: String,
}

/// Codes only go to existing accounts; this path never signs anyone up. The
/// reply is the same either way so it does not reveal which emails exist.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn send_code(
    State(identities): State<Identities>,
    Form(SendCodeForm { email }): Form<SendCodeForm>,
) -> ActionResult {
    let email = email.trim().to_lowercase();

    match identities.issue_code(&email).await {
        Ok(code) => {
            // there is no mailer; the log is the outbox
            tracing::info!(%email, %code, "one-time code issued");
        }
        Err(IdentityError::UnknownAccount) => {
            tracing::debug!(%email, "one-time code requested for unknown email");
        }
        Err(err) => return Err(err).or_provider("コード送信失敗"),
    }
    Ok(Done::new().message(CODE_SENT))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn verify_code(
    State(identities): State<Identities>,
    viewer: Viewer,
    Form(VerifyCodeForm { email, code }): Form<VerifyCodeForm>,
) -> ActionResult {
    let email = email.trim().to_lowercase();

    let identity = match identities.verify_code(&email, &code).await {
        Ok(identity) => identity,
        Err(IdentityError::InvalidCode) => {
            return Err(ActionError::invalid("認証失敗: コードが無効か期限切れです"));
        }
        Err(err) => return Err(err).or_provider("認証失敗"),
    };

    tracing::info!(id = %identity.id, "signed in with one-time code");
    let next = viewer.sign_in(identity.id).await.or_provider("認証失敗")?;
    Ok(Done::new().redirect(next))
}
