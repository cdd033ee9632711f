//! Credential store boundary.
//!
//! The credential flows only need a handful of operations from whatever
//! holds the accounts. `PgCredentialStore` backs production; the in-memory
//! store backs tests and throwaway servers.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::AuthError;
use crate::models::auth::{CredentialRecord, NewCredential};

pub use memory::InMemoryCredentialStore;
pub use postgres::PgCredentialStore;

/// Persistence operations consumed by the credential flows.
///
/// Implementations must enforce email and username uniqueness themselves:
/// `create` and `save` fail with `AuthError::DuplicateIdentity` on conflict.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Single combined lookup: a record whose email equals `email` or whose
    /// username equals `username`. An email match wins over a username match.
    async fn find_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<CredentialRecord>, AuthError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CredentialRecord>, AuthError>;

    async fn create(&self, credential: NewCredential) -> Result<CredentialRecord, AuthError>;

    async fn save(&self, record: &CredentialRecord) -> Result<(), AuthError>;
}
