pub mod accounts;
pub mod admin;
pub mod applications;
pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod forms;
pub mod identity;
pub mod index;
pub mod jobs;
pub mod learning;
pub mod mypage;
pub mod outcome;
pub mod policy;
pub mod profiles;
pub mod res;
pub mod session;
pub mod settings;
pub mod storage;
pub mod telemetry;

use axum::{extract::FromRef, http::StatusCode, response::{IntoResponse, Response}, routing::get, Router};
use sqlx::SqlitePool;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

use config::SessionConfig;
use identity::Identities;
use storage::ObjectStore;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub identities: Identities,
    pub objects: ObjectStore,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, identities: Identities, objects: ObjectStore) -> Self {
        Self { db_pool, identities, objects }
    }
}

/// Builds the full router: pages, mutation endpoints, uploads and the session layer.
pub fn app(app_state: AppState, sessions: &SessionConfig) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(sessions.secure)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(sessions.idle_minutes)));

    let uploads = ServeDir::new(app_state.objects.root());
    let max_upload = app_state.objects.max_bytes();

    Router::new()
        .route("/", get(index::index))
        .route("/mypage", get(mypage::mypage))
        .route("/static/forms.js", get(res::forms_js))

        .merge(auth::router())
        .nest("/jobs", jobs::router())
        .nest("/learning", learning::router())
        .nest("/users", profiles::router())
        .nest("/settings", settings::router())
        .nest("/admin", admin::router())
        .merge(storage::router(max_upload))
        .nest_service("/uploads", uploads)

        .with_state(app_state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
}

pub type AppResult<T> = Result<T, AppError>;
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = ?self.0, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "内部エラーが発生しました",
        )
            .into_response()
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        Self(anyhow::Error::msg(err))
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        Self(anyhow::Error::msg(err.to_owned()))
    }
}

macro_rules! apperr_impl {
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(err: $E) -> Self {
                Self(anyhow::Error::from(err))
            }
        }
    };
}

apperr_impl!(anyhow::Error);
apperr_impl!(serde_json::Error);
apperr_impl!(sqlx::Error);
apperr_impl!(tower_sessions::session::Error);
apperr_impl!(axum::Error);
apperr_impl!(identity::IdentityError);
