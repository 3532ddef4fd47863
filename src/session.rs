use axum::{extract::FromRequestParts, http::request::Parts};
use sqlx::{FromRow, SqlitePool};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    db::{FontSize, Profile},
    forms,
    outcome::ActionError,
    policy::Actor,
    AppError, AppResult, AppState,
};

pub const USER_ID: &str = "user_id";
pub const RETURN_URL: &str = "return_url";

/// Session context resolved once per request: who is acting, and their profile.
pub struct Viewer {
    session: Session,
    actor: Option<Actor>,
    email: Option<String>,
    profile: Option<Profile>,
}

#[derive(FromRow)]
struct ViewerRow {
    email: String,
    #[sqlx(flatten)]
    profile: Profile,
}

impl FromRequestParts<AppState> for Viewer {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::from(msg))?;

        let Some(user_id) = session.get::<Uuid>(USER_ID).await? else {
            return Ok(Viewer::anonymous(session));
        };

        match load(&state.db_pool, user_id).await? {
            Some(ViewerRow { email, profile }) => Ok(Viewer {
                session,
                actor: Some(Actor { id: profile.id, role: profile.role }),
                email: Some(email),
                profile: Some(profile),
            }),
            None => {
                tracing::debug!(%user_id, "session refers to a missing identity, dropping it");
                session.flush().await?;
                Ok(Viewer::anonymous(session))
            }
        }
    }
}

async fn load(db_pool: &SqlitePool, user_id: Uuid) -> Result<Option<ViewerRow>, sqlx::Error> {
    sqlx::query_as("SELECT i.email, p.* FROM profiles p JOIN identities i ON i.id = p.id WHERE p.id = ?")
        .bind(user_id)
        .fetch_optional(db_pool)
        .await
}

impl Viewer {
    fn anonymous(session: Session) -> Self {
        Viewer { session, actor: None, email: None, profile: None }
    }

    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn font_size(&self) -> FontSize {
        self.profile.as_ref().map(|p| p.font_size).unwrap_or_default()
    }

    /// The acting identity, or an unauthenticated error for mutations.
    pub fn require(&self) -> Result<&Actor, ActionError> {
        self.actor.as_ref().ok_or(ActionError::Unauthenticated { return_to: None })
    }

    pub async fn remember_return_url(&self, path: &str) -> AppResult<()> {
        self.session.insert(RETURN_URL, path).await?;
        Ok(())
    }

    /// Starts a fresh session for `user_id` and returns where to go next.
    pub async fn sign_in(&self, user_id: Uuid) -> Result<String, tower_sessions::session::Error> {
        let return_url = self.session.remove::<String>(RETURN_URL).await?;
        self.session.cycle_id().await?;
        self.session.insert(USER_ID, user_id).await?;
        Ok(return_url
            .and_then(|path| forms::local_path(&path))
            .unwrap_or_else(|| "/".to_owned()))
    }

    pub async fn sign_out(&self) -> Result<(), tower_sessions::session::Error> {
        self.session.flush().await
    }
}
