//! Authorization gate — capability checks against verified claims.

use super::AuthError;
use super::jwt::VerifiedClaims;

/// A named authorization requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Any verified identity.
    Authenticated,
    /// Only tokens that carry `isCreator: true`.
    CreatorOnly,
}

/// Decide whether `claims` may exercise `capability`.
///
/// Pure and deterministic; the decision is never cached.
pub fn authorize(claims: &VerifiedClaims, capability: Capability) -> Result<(), AuthError> {
    match capability {
        Capability::Authenticated => Ok(()),
        Capability::CreatorOnly if claims.is_creator() => Ok(()),
        Capability::CreatorOnly => Err(AuthError::Forbidden(
            "Creator privileges required".into(),
        )),
    }
}
