//! Applications: one row per (listing, applicant), enforced by the schema.

use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    db::{Application, ApplicationStatus},
    outcome::{ActionError, OrProvider},
    policy::{self, Action, Actor, Target},
};

/// Submits a pending application.
///
/// There is no existence pre-check: the UNIQUE (job_id, applicant_id)
/// constraint decides, so two concurrent submissions produce one row and one
/// "already applied" error.
pub async fn submit(db_pool: &SqlitePool, actor: Option<&Actor>, job_id: Uuid) -> Result<Application, ActionError> {
    let Some(actor) = actor else {
        return Err(ActionError::sign_in_then(format!("/jobs/{job_id}")));
    };

    let owner: Option<Uuid> = sqlx::query_scalar("SELECT created_by FROM jobs WHERE id = ?")
        .bind(job_id)
        .fetch_optional(db_pool)
        .await
        .or_provider("応募に失敗しました")?;
    let owner = owner.ok_or(ActionError::NotFound("求人"))?;

    policy::authorize(Some(actor), Action::Apply, Target::Listing { owner })?;

    let application = Application {
        id: Uuid::now_v7(),
        job_id,
        applicant_id: actor.id,
        status: ApplicationStatus::Pending,
        created_at: OffsetDateTime::now_utc(),
    };

    let inserted = sqlx::query(
        "INSERT INTO applications (id, job_id, applicant_id, status, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(application.id)
    .bind(application.job_id)
    .bind(application.applicant_id)
    .bind(application.status)
    .bind(application.created_at)
    .execute(db_pool)
    .await;

    match inserted {
        Ok(_) => {
            tracing::info!(%job_id, applicant = %actor.id, "application submitted");
            Ok(application)
        }
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => Err(ActionError::AlreadyApplied),
        // the listing was deleted between the lookup and the insert
        Err(sqlx::Error::Database(err)) if err.is_foreign_key_violation() => Err(ActionError::NotFound("求人")),
        Err(err) => Err(err).or_provider("応募に失敗しました"),
    }
}

pub async fn has_applied(db_pool: &SqlitePool, job_id: Uuid, applicant_id: Uuid) -> Result<bool, sqlx::Error> {
    let found: Option<Uuid> = sqlx::query_scalar("SELECT id FROM applications WHERE job_id = ? AND applicant_id = ?")
        .bind(job_id)
        .bind(applicant_id)
        .fetch_optional(db_pool)
        .await?;
    Ok(found.is_some())
}

/// An application as its applicant sees it on "my page".
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SentApplication {
    pub id: Uuid,
    pub job_id: Uuid,
    pub status: ApplicationStatus,
    pub created_at: OffsetDateTime,
    pub job_title: String,
    pub job_location: String,
}

pub async fn for_applicant(db_pool: &SqlitePool, applicant_id: Uuid) -> Result<Vec<SentApplication>, sqlx::Error> {
    sqlx::query_as(
        "SELECT a.id, a.job_id, a.status, a.created_at, j.title AS job_title, j.location AS job_location
         FROM applications a JOIN jobs j ON j.id = a.job_id
         WHERE a.applicant_id = ?
         ORDER BY a.created_at DESC",
    )
    .bind(applicant_id)
    .fetch_all(db_pool)
    .await
}

/// An application as the listing's owner sees it.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Applicant {
    pub id: Uuid,
    pub job_id: Uuid,
    pub applicant_id: Uuid,
    pub status: ApplicationStatus,
    pub created_at: OffsetDateTime,
    pub display_name: Option<String>,
    pub bio: Option<String>,
}

pub async fn for_listing(db_pool: &SqlitePool, job_id: Uuid) -> Result<Vec<Applicant>, sqlx::Error> {
    sqlx::query_as(
        "SELECT a.id, a.job_id, a.applicant_id, a.status, a.created_at, p.display_name, p.bio
         FROM applications a LEFT JOIN profiles p ON p.id = a.applicant_id
         WHERE a.job_id = ?
         ORDER BY a.created_at DESC",
    )
    .bind(job_id)
    .fetch_all(db_pool)
    .await
}

pub async fn for_owner(db_pool: &SqlitePool, owner_id: Uuid) -> Result<Vec<Applicant>, sqlx::Error> {
    sqlx::query_as(
        "SELECT a.id, a.job_id, a.applicant_id, a.status, a.created_at, p.display_name, p.bio
         FROM applications a
         JOIN jobs j ON j.id = a.job_id
         LEFT JOIN profiles p ON p.id = a.applicant_id
         WHERE j.created_by = ?
         ORDER BY a.created_at DESC",
    )
    .bind(owner_id)
    .fetch_all(db_pool)
    .await
}

pub async fn delete_by_applicant<'e, E: SqliteExecutor<'e>>(db: E, applicant_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM applications WHERE applicant_id = ?")
        .bind(applicant_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}
