//! Identity provider: credentials, one-time codes and account records.
//!
//! Profiles are not created here; the `identities_create_profile` trigger in
//! the schema does that when an identity row appears.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::Rng;
use sqlx::{FromRow, SqlitePool};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Wrong guesses a code survives before it is discarded.
pub const MAX_CODE_ATTEMPTS: i64 = 5;

#[derive(Debug, Clone, FromRow)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("email address already registered")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("no account for this email address")]
    UnknownAccount,
    #[error("code is invalid or expired")]
    InvalidCode,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("password hashing failed: {0}")]
    Hashing(argon2::password_hash::Error),
    #[error(transparent)]
    Blocking(#[from] tokio::task::JoinError),
}

#[derive(Clone)]
pub struct Identities {
    db_pool: SqlitePool,
    otp_ttl: Duration,
}

#[derive(FromRow)]
struct Credentials {
    id: Uuid,
    email: String,
    password_hash: String,
}

impl Identities {
    pub fn new(db_pool: SqlitePool, otp_ttl: Duration) -> Self {
        Self { db_pool, otp_ttl }
    }

    pub async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> Result<Identity, IdentityError> {
        let id = Uuid::now_v7();
        let password_hash = hash_password(password.to_owned()).await?;

        let inserted = sqlx::query(
            "INSERT INTO identities (id, email, password_hash, signup_display_name, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(email)
        .bind(password_hash)
        .bind(display_name)
        .bind(OffsetDateTime::now_utc())
        .execute(&self.db_pool)
        .await;

        match inserted {
            Ok(_) => {
                tracing::info!(%id, "identity created");
                Ok(Identity { id, email: email.to_owned() })
            }
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => Err(IdentityError::EmailTaken),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        let Some(credentials) = self.credentials(email).await? else {
            return Err(IdentityError::InvalidCredentials);
        };

        if !verify_password(password.to_owned(), credentials.password_hash).await? {
            return Err(IdentityError::InvalidCredentials);
        }

        Ok(Identity { id: credentials.id, email: credentials.email })
    }

    /// Issues a fresh code for an existing identity, replacing any earlier one.
    /// Never creates an identity.
    pub async fn issue_code(&self, email: &str) -> Result<String, IdentityError> {
        let identity = self.find_by_email(email).await?.ok_or(IdentityError::UnknownAccount)?;
        let code = generate_code();

        sqlx::query(
            "INSERT INTO one_time_codes (identity_id, code, expires_at) VALUES (?, ?, ?)
             ON CONFLICT (identity_id) DO UPDATE SET code = excluded.code, expires_at = excluded.expires_at, attempts = 0",
        )
        .bind(identity.id)
        .bind(&code)
        .bind(OffsetDateTime::now_utc() + self.otp_ttl)
        .execute(&self.db_pool)
        .await?;

        Ok(code)
    }

    /// Consumes a code. A matching code is deleted even when it turns out to be
    /// expired. Every miss counts against the code, which is dropped once
    /// [`MAX_CODE_ATTEMPTS`] misses are reached.
    pub async fn verify_code(&self, email: &str, code: &str) -> Result<Identity, IdentityError> {
        let identity = self.find_by_email(email).await?.ok_or(IdentityError::InvalidCode)?;

        let expires_at: Option<OffsetDateTime> = sqlx::query_scalar(
            "DELETE FROM one_time_codes WHERE identity_id = ? AND code = ? RETURNING expires_at",
        )
        .bind(identity.id)
        .bind(code.trim())
        .fetch_optional(&self.db_pool)
        .await?;

        match expires_at {
            Some(expires_at) if expires_at > OffsetDateTime::now_utc() => Ok(identity),
            Some(_) => Err(IdentityError::InvalidCode),
            None => {
                self.count_miss(identity.id).await?;
                Err(IdentityError::InvalidCode)
            }
        }
    }

    async fn count_miss(&self, id: Uuid) -> Result<(), IdentityError> {
        let attempts: Option<i64> = sqlx::query_scalar(
            "UPDATE one_time_codes SET attempts = attempts + 1 WHERE identity_id = ? RETURNING attempts",
        )
        .bind(id)
        .fetch_optional(&self.db_pool)
        .await?;

        if attempts.is_some_and(|attempts| attempts >= MAX_CODE_ATTEMPTS) {
            sqlx::query("DELETE FROM one_time_codes WHERE identity_id = ?")
                .bind(id)
                .execute(&self.db_pool)
                .await?;
            tracing::warn!(%id, "one-time code discarded after too many wrong guesses");
        }
        Ok(())
    }

    pub async fn update_password(&self, id: Uuid, password: &str) -> Result<(), IdentityError> {
        let password_hash = hash_password(password.to_owned()).await?;
        sqlx::query("UPDATE identities SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(&self.db_pool)
            .await?;
        Ok(())
    }

    pub async fn update_email(&self, id: Uuid, email: &str) -> Result<(), IdentityError> {
        let updated = sqlx::query("UPDATE identities SET email = ? WHERE id = ?")
            .bind(email)
            .bind(id)
            .execute(&self.db_pool)
            .await;

        match updated {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => Err(IdentityError::EmailTaken),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, IdentityError> {
        Ok(sqlx::query_as("SELECT id, email FROM identities WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.db_pool)
            .await?)
    }

    async fn credentials(&self, email: &str) -> Result<Option<Credentials>, IdentityError> {
        Ok(sqlx::query_as("SELECT id, email, password_hash FROM identities WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.db_pool)
            .await?)
    }
}

fn generate_code() -> String {
    format!("{:06}", rand::rng().random_range(0..1_000_000u32))
}

async fn hash_password(password: String) -> Result<String, IdentityError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(IdentityError::Hashing)
    })
    .await?
}

async fn verify_password(password: String, password_hash: String) -> Result<bool, IdentityError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&password_hash).map_err(IdentityError::Hashing)?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(err) => Err(IdentityError::Hashing(err)),
        }
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    async fn identities(otp_ttl: Duration) -> Identities {
        let db_pool = connect_in_memory().await.expect("in-memory db");
        Identities::new(db_pool, otp_ttl)
    }

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let ids = identities(Duration::minutes(10)).await;
        let created = ids.sign_up("digger@example.com", "trowel1", "Digger").await.expect("sign up");

        let signed_in = ids.sign_in("digger@example.com", "trowel1").await.expect("sign in");
        assert_eq!(signed_in.id, created.id);

        assert!(matches!(
            ids.sign_in("digger@example.com", "wrong-pass").await,
            Err(IdentityError::InvalidCredentials)
        ));
        assert!(matches!(
            ids.sign_in("nobody@example.com", "trowel1").await,
            Err(IdentityError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let ids = identities(Duration::minutes(10)).await;
        ids.sign_up("digger@example.com", "trowel1", "Digger").await.expect("first sign up");
        assert!(matches!(
            ids.sign_up("digger@example.com", "trowel2", "Other").await,
            Err(IdentityError::EmailTaken)
        ));
    }

    #[tokio::test]
    async fn codes_are_single_use() {
        let ids = identities(Duration::minutes(10)).await;
        ids.sign_up("digger@example.com", "trowel1", "Digger").await.expect("sign up");

        let code = ids.issue_code("digger@example.com").await.expect("code issued");
        assert_eq!(code.len(), 6);

        ids.verify_code("digger@example.com", &code).await.expect("first use works");
        assert!(matches!(
            ids.verify_code("digger@example.com", &code).await,
            Err(IdentityError::InvalidCode)
        ));
    }

    #[tokio::test]
    async fn expired_codes_are_refused() {
        let ids = identities(Duration::minutes(-1)).await;
        ids.sign_up("digger@example.com", "trowel1", "Digger").await.expect("sign up");

        let code = ids.issue_code("digger@example.com").await.expect("code issued");
        assert!(matches!(
            ids.verify_code("digger@example.com", &code).await,
            Err(IdentityError::InvalidCode)
        ));
    }

    #[tokio::test]
    async fn codes_are_discarded_after_too_many_misses() {
        let ids = identities(Duration::minutes(10)).await;
        ids.sign_up("digger@example.com", "trowel1", "Digger").await.expect("sign up");

        let code = ids.issue_code("digger@example.com").await.expect("code issued");
        let wrong = if code == "000000" { "111111" } else { "000000" };
        for _ in 0..MAX_CODE_ATTEMPTS {
            assert!(matches!(
                ids.verify_code("digger@example.com", wrong).await,
                Err(IdentityError::InvalidCode)
            ));
        }

        assert!(matches!(
            ids.verify_code("digger@example.com", &code).await,
            Err(IdentityError::InvalidCode)
        ));

        let fresh = ids.issue_code("digger@example.com").await.expect("new code issued");
        ids.verify_code("digger@example.com", &fresh).await.expect("new code starts with a clean count");
    }

    #[tokio::test]
    async fn a_few_misses_leave_the_code_usable() {
        let ids = identities(Duration::minutes(10)).await;
        ids.sign_up("digger@example.com", "trowel1", "Digger").await.expect("sign up");

        let code = ids.issue_code("digger@example.com").await.expect("code issued");
        let wrong = if code == "000000" { "111111" } else { "000000" };
        for _ in 1..MAX_CODE_ATTEMPTS {
            assert!(ids.verify_code("digger@example.com", wrong).await.is_err());
        }
        ids.verify_code("digger@example.com", &code).await.expect("still under the cap");
    }

    #[tokio::test]
    async fn codes_are_never_issued_for_unknown_accounts() {
        let ids = identities(Duration::minutes(10)).await;
        assert!(matches!(
            ids.issue_code("ghost@example.com").await,
            Err(IdentityError::UnknownAccount)
        ));
    }
}
