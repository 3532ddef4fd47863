//! The uniform result shape of every mutation endpoint:
//! `{"error": "..."}` or `{"success": true, "message"?: "...", "redirect"?: "..."}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::policy::Denial;

pub const SIGN_IN_PATH: &str = "/auth";

pub type ActionResult = Result<Done, ActionError>;

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("{0}")]
    Invalid(String),
    #[error("ログインが必要です")]
    Unauthenticated { return_to: Option<String> },
    #[error("権限がありません")]
    Forbidden,
    #[error("自分の権限は変更できません")]
    SelfRoleChange,
    #[error("{0}が見つかりません")]
    NotFound(&'static str),
    #[error("すでに応募済みです")]
    AlreadyApplied,
    /// Store or provider failure. Only `context` reaches the client.
    #[error("{context}")]
    Provider {
        context: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl ActionError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    /// Unauthenticated, with the page to come back to after signing in.
    pub fn sign_in_then(return_to: impl Into<String>) -> Self {
        Self::Unauthenticated { return_to: Some(return_to.into()) }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ActionError::Invalid(_) => StatusCode::BAD_REQUEST,
            ActionError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            ActionError::Forbidden | ActionError::SelfRoleChange => StatusCode::FORBIDDEN,
            ActionError::NotFound(_) => StatusCode::NOT_FOUND,
            ActionError::AlreadyApplied => StatusCode::CONFLICT,
            ActionError::Provider { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Denial> for ActionError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Unauthenticated => ActionError::Unauthenticated { return_to: None },
            Denial::Forbidden => ActionError::Forbidden,
            Denial::SelfRoleChange => ActionError::SelfRoleChange,
        }
    }
}

impl IntoResponse for ActionError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ActionError::Provider { context, source } => {
                tracing::error!(error = ?source, "{context}");
                json!({ "error": context })
            }
            ActionError::Unauthenticated { return_to } => {
                let redirect = match return_to {
                    Some(path) => format!("{SIGN_IN_PATH}?return_url={path}"),
                    None => SIGN_IN_PATH.to_owned(),
                };
                json!({ "error": self.to_string(), "redirect": redirect })
            }
            other => {
                tracing::debug!(%status, error = %other, "mutation rejected");
                json!({ "error": other.to_string() })
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Maps a store/provider failure to a localized message, keeping the cause for the log.
pub trait OrProvider<T> {
    fn or_provider(self, context: &'static str) -> Result<T, ActionError>;
}

impl<T, E> OrProvider<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn or_provider(self, context: &'static str) -> Result<T, ActionError> {
        self.map_err(|err| ActionError::Provider { context, source: err.into() })
    }
}

#[derive(Debug, Serialize)]
pub struct Done {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect: Option<String>,
}

impl Done {
    pub fn new() -> Self {
        Self { success: true, message: None, redirect: None }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn redirect(mut self, to: impl Into<String>) -> Self {
        self.redirect = Some(to.into());
        self
    }
}

impl Default for Done {
    fn default() -> Self {
        Self::new()
    }
}

impl IntoResponse for Done {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_omits_empty_fields() {
        let body = serde_json::to_value(Done::new().message("更新しました")).expect("serializes");
        assert_eq!(body, json!({ "success": true, "message": "更新しました" }));
    }

    #[test]
    fn errors_map_to_statuses() {
        assert_eq!(ActionError::AlreadyApplied.status(), StatusCode::CONFLICT);
        assert_eq!(ActionError::from(Denial::Forbidden).status(), StatusCode::FORBIDDEN);
        assert_eq!(ActionError::NotFound("求人").to_string(), "求人が見つかりません");
    }

    #[test]
    fn provider_errors_hide_the_cause() {
        let err = Err::<(), _>(anyhow::anyhow!("disk on fire"))
            .or_provider("更新に失敗しました")
            .expect_err("maps to provider error");
        assert_eq!(err.to_string(), "更新に失敗しました");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
