//! Account deletion.
//!
//! The whole account goes in one transaction when it can. When that fails the
//! stepwise path takes over: an `account_deletions` row records the next step
//! to run, every step is idempotent, and an interrupted deletion is picked up
//! again by [`resume_pending`].

use std::{fmt, str::FromStr};

use sqlx::{SqliteExecutor, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{applications, db::UnknownVariant, jobs, learning, profiles};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionStep {
    Applications,
    Listings,
    Articles,
    Profile,
    Identity,
}

impl DeletionStep {
    pub const ORDER: [DeletionStep; 5] = [
        DeletionStep::Applications,
        DeletionStep::Listings,
        DeletionStep::Articles,
        DeletionStep::Profile,
        DeletionStep::Identity,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DeletionStep::Applications => "applications",
            DeletionStep::Listings => "listings",
            DeletionStep::Articles => "articles",
            DeletionStep::Profile => "profile",
            DeletionStep::Identity => "identity",
        }
    }

    fn next(self) -> Option<DeletionStep> {
        let at = Self::ORDER.iter().position(|step| *step == self)?;
        Self::ORDER.get(at + 1).copied()
    }

    async fn run<'e, E: SqliteExecutor<'e>>(self, db: E, id: Uuid) -> Result<u64, sqlx::Error> {
        match self {
            DeletionStep::Applications => applications::delete_by_applicant(db, id).await,
            DeletionStep::Listings => jobs::store::delete_by_owner(db, id).await,
            DeletionStep::Articles => learning::store::delete_by_author(db, id).await,
            DeletionStep::Profile => profiles::store::delete(db, id).await,
            DeletionStep::Identity => delete_identity(db, id).await,
        }
    }
}

impl FromStr for DeletionStep {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ORDER
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("deletion step", s))
    }
}

impl fmt::Display for DeletionStep {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeletionError {
    #[error("account deletion stopped before step '{step}'")]
    Stopped {
        step: DeletionStep,
        #[source]
        source: sqlx::Error,
    },
    #[error("deletion job is corrupt: {0}")]
    Corrupt(#[from] UnknownVariant),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    /// Everything went in a single transaction.
    Atomic,
    /// The transaction failed and the stepwise path finished the job.
    Stepwise,
}

async fn delete_identity<'e, E: SqliteExecutor<'e>>(db: E, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM identities WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}

async fn delete_atomically(db_pool: &SqlitePool, id: Uuid) -> Result<(), sqlx::Error> {
    let mut tx = db_pool.begin().await?;
    for step in DeletionStep::ORDER {
        step.run(&mut *tx, id).await?;
    }
    tx.commit().await
}

/// Removes the identity and everything it owns: applications, listings (with
/// the applications they received), articles, profile, identity.
pub async fn delete_account(db_pool: &SqlitePool, id: Uuid) -> Result<Deletion, DeletionError> {
    match delete_atomically(db_pool, id).await {
        Ok(()) => {
            tracing::info!(%id, "account deleted");
            return Ok(Deletion::Atomic);
        }
        Err(err) => tracing::warn!(%id, error = %err, "atomic account deletion failed, deleting stepwise"),
    }

    let now = OffsetDateTime::now_utc();
    sqlx::query(
        "INSERT INTO account_deletions (identity_id, next_step, created_at, updated_at) VALUES (?, ?, ?, ?)
         ON CONFLICT (identity_id) DO NOTHING",
    )
    .bind(id)
    .bind(DeletionStep::Applications.as_str())
    .bind(now)
    .bind(now)
    .execute(db_pool)
    .await?;

    purge_stepwise(db_pool, id).await?;
    Ok(Deletion::Stepwise)
}

/// Runs the recorded deletion job for `id` from its next step on. The job row
/// is removed once the identity itself is gone.
pub async fn purge_stepwise(db_pool: &SqlitePool, id: Uuid) -> Result<(), DeletionError> {
    let next: Option<String> = sqlx::query_scalar("SELECT next_step FROM account_deletions WHERE identity_id = ?")
        .bind(id)
        .fetch_optional(db_pool)
        .await?;
    let Some(next) = next else {
        return Ok(());
    };

    let mut step = Some(next.parse::<DeletionStep>()?);
    while let Some(current) = step {
        if let Err(source) = current.run(db_pool, id).await {
            tracing::error!(%id, step = %current, error = %source, "account deletion step failed");
            sqlx::query(
                "UPDATE account_deletions SET attempts = attempts + 1, last_error = ?, updated_at = ? WHERE identity_id = ?",
            )
            .bind(source.to_string())
            .bind(OffsetDateTime::now_utc())
            .bind(id)
            .execute(db_pool)
            .await?;
            return Err(DeletionError::Stopped { step: current, source });
        }

        step = current.next();
        match step {
            Some(following) => {
                sqlx::query("UPDATE account_deletions SET next_step = ?, updated_at = ? WHERE identity_id = ?")
                    .bind(following.as_str())
                    .bind(OffsetDateTime::now_utc())
                    .bind(id)
                    .execute(db_pool)
                    .await?;
            }
            None => {
                sqlx::query("DELETE FROM account_deletions WHERE identity_id = ?")
                    .bind(id)
                    .execute(db_pool)
                    .await?;
            }
        }
        tracing::debug!(%id, step = %current, "account deletion step done");
    }

    tracing::info!(%id, "account deleted stepwise");
    Ok(())
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ResumeReport {
    pub completed: usize,
    pub failed: usize,
}

/// Continues every deletion job left pending.
pub async fn resume_pending(db_pool: &SqlitePool) -> Result<ResumeReport, sqlx::Error> {
    let pending: Vec<Uuid> = sqlx::query_scalar("SELECT identity_id FROM account_deletions ORDER BY created_at")
        .fetch_all(db_pool)
        .await?;

    let mut report = ResumeReport::default();
    for id in pending {
        match purge_stepwise(db_pool, id).await {
            Ok(()) => report.completed += 1,
            Err(err) => {
                tracing::warn!(%id, error = %err, "deletion job still pending");
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_run_in_dependency_order() {
        let mut step = Some(DeletionStep::Applications);
        let mut seen = Vec::new();
        while let Some(current) = step {
            seen.push(current);
            step = current.next();
        }
        assert_eq!(seen, DeletionStep::ORDER);
    }

    #[test]
    fn step_names_round_trip_through_the_job_row() {
        assert_eq!("articles".parse::<DeletionStep>().ok(), Some(DeletionStep::Articles));
        assert!("everything".parse::<DeletionStep>().is_err());
    }
}
