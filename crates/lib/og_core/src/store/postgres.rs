//! PostgreSQL credential store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use super::CredentialStore;
use crate::auth::AuthError;
use crate::models::auth::{CreatorProfile, CredentialRecord, NewCredential, Role};

type CredentialRow = (
    Uuid,
    String,
    String,
    String,
    bool,
    Option<Json<CreatorProfile>>,
    DateTime<Utc>,
);

const SELECT_COLUMNS: &str =
    "SELECT id, username, email, password_hash, is_creator, creator_profile, created_at \
     FROM credentials";

/// Credential store backed by the `credentials` table.
#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the embedded migrations from `og_core/migrations/`.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn into_record(row: CredentialRow) -> CredentialRecord {
    let (id, username, email, password_hash, is_creator, profile, created_at) = row;
    // The table constraint keeps the flag and the profile in step.
    let role = if is_creator {
        Role::Creator(profile.map(|p| p.0).unwrap_or_else(CreatorProfile::initial))
    } else {
        Role::Member
    };
    CredentialRecord {
        id,
        username,
        email,
        password_hash,
        role,
        created_at,
    }
}

fn map_write_error(e: sqlx::Error) -> AuthError {
    match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => AuthError::DuplicateIdentity,
        other => AuthError::DbError(other),
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<CredentialRecord>, AuthError> {
        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            "{SELECT_COLUMNS} WHERE email = $1 OR username = $2 \
             ORDER BY (email = $1) DESC LIMIT 1"
        ))
        .bind(email)
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(into_record))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CredentialRecord>, AuthError> {
        let row = sqlx::query_as::<_, CredentialRow>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(into_record))
    }

    async fn create(&self, credential: NewCredential) -> Result<CredentialRecord, AuthError> {
        let profile = match &credential.role {
            Role::Creator(profile) => Some(Json(profile)),
            Role::Member => None,
        };
        let row = sqlx::query_as::<_, CredentialRow>(
            "INSERT INTO credentials \
                 (id, username, email, password_hash, is_creator, creator_profile) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, username, email, password_hash, is_creator, creator_profile, created_at",
        )
        .bind(Uuid::now_v7())
        .bind(&credential.username)
        .bind(&credential.email)
        .bind(&credential.password_hash)
        .bind(credential.role.is_creator())
        .bind(profile)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(into_record(row))
    }

    async fn save(&self, record: &CredentialRecord) -> Result<(), AuthError> {
        let result = sqlx::query(
            "UPDATE credentials \
             SET username = $2, email = $3, password_hash = $4, \
                 is_creator = $5, creator_profile = $6 \
             WHERE id = $1",
        )
        .bind(record.id)
        .bind(&record.username)
        .bind(&record.email)
        .bind(&record.password_hash)
        .bind(record.is_creator())
        .bind(record.creator_profile().map(Json))
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(AuthError::Internal(format!(
                "credential {} does not exist",
                record.id
            )));
        }
        Ok(())
    }
}
