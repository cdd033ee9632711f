//! Authentication domain models.
//!
//! Serialized shapes use camelCase field names.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Review state of a creator account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    #[default]
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Creator-only profile data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorProfile {
    pub content_count: i64,
    pub total_revenue: f64,
    pub subscriber_count: i64,
    pub content_categories: Vec<String>,
    pub featured: bool,
    pub verification_status: VerificationStatus,
}

impl CreatorProfile {
    /// Profile assigned the moment an account becomes a creator.
    pub fn initial() -> Self {
        Self::default()
    }
}

/// Account role. A creator always carries its profile, a member never does.
#[derive(Debug, Clone, PartialEq)]
pub enum Role {
    Member,
    Creator(CreatorProfile),
}

impl Role {
    /// Role for a fresh account.
    pub fn for_signup(is_creator: bool) -> Self {
        if is_creator {
            Self::Creator(CreatorProfile::initial())
        } else {
            Self::Member
        }
    }

    pub fn is_creator(&self) -> bool {
        matches!(self, Self::Creator(_))
    }
}

/// Stored credential record.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl CredentialRecord {
    pub fn is_creator(&self) -> bool {
        self.role.is_creator()
    }

    /// The creator profile, or `None` for members.
    pub fn creator_profile(&self) -> Option<&CreatorProfile> {
        match &self.role {
            Role::Creator(profile) => Some(profile),
            Role::Member => None,
        }
    }

    /// Transition a member into a creator, initialising the creator profile.
    ///
    /// Returns `false` when the account already was a creator; the existing
    /// profile is left untouched in that case.
    pub fn promote_to_creator(&mut self) -> bool {
        if self.is_creator() {
            return false;
        }
        self.role = Role::Creator(CreatorProfile::initial());
        true
    }

    /// Public view of the record (no password hash).
    pub fn to_user(&self) -> AuthUser {
        AuthUser {
            id: self.id.to_string(),
            username: self.username.clone(),
            email: self.email.clone(),
            is_creator: self.is_creator(),
            creator_profile: self.creator_profile().cloned(),
        }
    }
}

/// Input to `CredentialStore::create`. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Public user view returned alongside tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub is_creator: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_profile: Option<CreatorProfile>,
}

/// JWT claims embedded in access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    /// Identity of the authenticated account.
    pub user_id: String,
    /// Creator flag. Absent means "not a creator".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_creator: Option<bool>,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Unique token id, so two tokens issued in the same second differ.
    pub jti: String,
}
