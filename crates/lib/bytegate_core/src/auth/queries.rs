//! PostgreSQL-backed credential store.
//!
//! Handle uniqueness and the credential invariant are enforced by table
//! constraints (see `migrations/`), so concurrent registrations race inside
//! the database rather than in application code.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::AuthError;
use super::store::CredentialStore;
use crate::models::{Identity, Role};

type IdentityRow = (
    Uuid,
    String,
    String,
    Option<String>,
    bool,
    String,
    DateTime<Utc>,
    DateTime<Utc>,
);

const SELECT_IDENTITY: &str = "SELECT id, handle, display_name, credential_hash, \
     externally_authenticated, role, created_at, updated_at FROM identities";

/// Credential store over a `PgPool`.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn identity_from_row(row: IdentityRow) -> Result<Identity, AuthError> {
    let (id, handle, display_name, hash, external, role, created_at, updated_at) = row;
    let role = role
        .parse::<Role>()
        .map_err(|e| AuthError::Internal(format!("stored identity {id}: {e}")))?;
    Identity::from_parts(id, handle, display_name, hash, external, role, created_at, updated_at)
}

/// Map constraint failures onto the protocol's error kinds.
fn map_write_error(e: sqlx::Error, handle: &str) -> AuthError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return AuthError::DuplicateIdentity(handle.to_string());
        }
        if db.is_check_violation() {
            return AuthError::ConstraintViolation(db.message().to_string());
        }
    }
    AuthError::Store(e)
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_handle(&self, handle: &str) -> Result<Option<Identity>, AuthError> {
        let row = sqlx::query_as::<_, IdentityRow>(&format!("{SELECT_IDENTITY} WHERE handle = $1"))
            .bind(handle)
            .fetch_optional(&self.pool)
            .await?;
        row.map(identity_from_row).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, AuthError> {
        let row = sqlx::query_as::<_, IdentityRow>(&format!("{SELECT_IDENTITY} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(identity_from_row).transpose()
    }

    async fn exists(&self, id: Uuid) -> Result<bool, AuthError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM identities WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn insert(&self, identity: &Identity) -> Result<(), AuthError> {
        sqlx::query(
            "INSERT INTO identities \
             (id, handle, display_name, credential_hash, externally_authenticated, role, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(identity.id)
        .bind(&identity.handle)
        .bind(&identity.display_name)
        .bind(identity.credential_hash())
        .bind(identity.is_externally_authenticated())
        .bind(identity.role.as_str())
        .bind(identity.created_at)
        .bind(identity.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &identity.handle))?;
        Ok(())
    }

    async fn update(&self, identity: &Identity) -> Result<(), AuthError> {
        let result = sqlx::query(
            "UPDATE identities SET role = $2, credential_hash = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(identity.id)
        .bind(identity.role.as_str())
        .bind(identity.credential_hash())
        .bind(identity.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &identity.handle))?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound(format!("identity {}", identity.id)));
        }
        Ok(())
    }
}
