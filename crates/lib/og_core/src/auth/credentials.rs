//! Credential flows — registration, login, refresh and role promotion.
//!
//! Every successful flow ends in a freshly issued token plus the public view
//! of the account. Nothing about issued tokens is remembered here.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use uuid::Uuid;

use super::AuthError;
use super::jwt::{IssueClaims, TokenIssuer, TokenVerifier, VerifiedClaims};
use super::password::{
    MAX_PASSWORD_BYTES, hash_password, hash_password_blocking, verify_password_blocking,
};
use crate::config::AuthConfig;
use crate::models::auth::{AuthUser, CredentialRecord, NewCredential, Role, VerificationStatus};
use crate::store::CredentialStore;

/// Minimum password length, in bytes.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Minimum username length, in characters.
pub const MIN_USERNAME_LEN: usize = 3;

/// Registration input, before normalisation.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    pub is_creator: bool,
}

/// A freshly issued token and the account it speaks for.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub user: AuthUser,
}

/// Lowercase and trim an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trim a username. Usernames keep their case.
pub fn normalize_username(username: &str) -> String {
    username.trim().to_string()
}

fn validate_account(username: &str, email: &str, password: &str) -> Result<(), AuthError> {
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(AuthError::ValidationError(format!(
            "Username must be at least {MIN_USERNAME_LEN} characters"
        )));
    }
    if username.contains('@') {
        return Err(AuthError::ValidationError(
            "Username must not contain '@'".into(),
        ));
    }
    if !looks_like_email(email) {
        return Err(AuthError::ValidationError("Invalid email format".into()));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AuthError::ValidationError(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AuthError::ValidationError(format!(
            "Password must be at most {MAX_PASSWORD_BYTES} bytes"
        )));
    }
    Ok(())
}

/// `local@domain.tld` with no whitespace.
fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

/// Registration, login and refresh over a [`CredentialStore`].
pub struct CredentialService {
    store: Arc<dyn CredentialStore>,
    issuer: TokenIssuer,
    verifier: TokenVerifier,
    bcrypt_cost: u32,
    store_timeout: Duration,
    /// Verified against when the identity is unknown, so that case costs
    /// the same hash work as a wrong password.
    dummy_hash: String,
}

impl CredentialService {
    pub fn new(store: Arc<dyn CredentialStore>, config: &AuthConfig) -> Result<Self, AuthError> {
        let dummy_hash = hash_password("og-dummy-password", config.bcrypt_cost)?;
        Ok(Self {
            store,
            issuer: config.issuer(),
            verifier: config.verifier(),
            bcrypt_cost: config.bcrypt_cost,
            store_timeout: config.store_timeout,
            dummy_hash,
        })
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Create an account and issue its first token.
    pub async fn register(&self, account: NewAccount) -> Result<IssuedToken, AuthError> {
        let username = normalize_username(&account.username);
        let email = normalize_email(&account.email);
        validate_account(&username, &email, &account.password)?;

        // One combined lookup; the store's unique constraints cover the
        // window between this check and the insert.
        if self
            .bounded(self.store.find_by_email_or_username(&email, &username))
            .await?
            .is_some()
        {
            debug!(%email, %username, "registration rejected: identity exists");
            return Err(AuthError::DuplicateIdentity);
        }

        let password_hash = hash_password_blocking(account.password, self.bcrypt_cost).await?;
        let record = self
            .bounded(self.store.create(NewCredential {
                username,
                email,
                password_hash,
                role: Role::for_signup(account.is_creator),
            }))
            .await?;

        info!(user_id = %record.id, is_creator = record.is_creator(), "registered account");
        self.issue_for(&record)
    }

    /// Authenticate by email or username and password.
    pub async fn login(&self, key: &str, password: &str) -> Result<IssuedToken, AuthError> {
        let record = self.authenticate(key, password).await?;
        info!(user_id = %record.id, "login");
        self.issue_for(&record)
    }

    /// Authenticate a creator account.
    ///
    /// A member account is reported exactly like a wrong password. A creator
    /// whose verification was rejected is refused only after the password
    /// checks out.
    pub async fn creator_login(&self, key: &str, password: &str) -> Result<IssuedToken, AuthError> {
        let record = self.authenticate(key, password).await?;
        let Some(profile) = record.creator_profile() else {
            debug!(user_id = %record.id, "creator login by member account");
            return Err(AuthError::InvalidCredentials);
        };
        if profile.verification_status == VerificationStatus::Rejected {
            info!(user_id = %record.id, "creator login refused: verification rejected");
            return Err(AuthError::Forbidden(
                "Your creator account has been rejected. Please contact support.".into(),
            ));
        }
        info!(user_id = %record.id, "creator login");
        self.issue_for(&record)
    }

    /// Exchange a still-valid (or recently expired) token for a new one.
    ///
    /// The role is re-read from the store, so a promotion shows up in the
    /// refreshed token.
    pub async fn refresh(&self, token: &str) -> Result<IssuedToken, AuthError> {
        let claims = self.verifier.verify_for_refresh(token)?;
        let record = self.record_for(&claims).await?;
        debug!(user_id = %record.id, "token refreshed");
        self.issue_for(&record)
    }

    /// Public view of the account behind verified claims.
    pub async fn profile(&self, claims: &VerifiedClaims) -> Result<AuthUser, AuthError> {
        Ok(self.record_for(claims).await?.to_user())
    }

    /// Turn the account behind `claims` into a creator and issue a token
    /// that carries the new role. Already-creator accounts are unchanged.
    pub async fn promote_to_creator(
        &self,
        claims: &VerifiedClaims,
    ) -> Result<IssuedToken, AuthError> {
        let mut record = self.record_for(claims).await?;
        if record.promote_to_creator() {
            self.bounded(self.store.save(&record)).await?;
            info!(user_id = %record.id, "account promoted to creator");
        }
        self.issue_for(&record)
    }

    async fn authenticate(&self, key: &str, password: &str) -> Result<CredentialRecord, AuthError> {
        let record = self
            .bounded(
                self.store
                    .find_by_email_or_username(&normalize_email(key), &normalize_username(key)),
            )
            .await?;

        let hash = record
            .as_ref()
            .map_or_else(|| self.dummy_hash.clone(), |r| r.password_hash.clone());
        let matches = verify_password_blocking(password.to_string(), hash).await?;
        // bcrypt ignores bytes past the limit.
        let matches = matches && password.len() <= MAX_PASSWORD_BYTES;

        match record {
            Some(record) if matches => Ok(record),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn record_for(&self, claims: &VerifiedClaims) -> Result<CredentialRecord, AuthError> {
        let id = Uuid::parse_str(claims.user_id())
            .map_err(|_| AuthError::InvalidToken("malformed subject".into()))?;
        self.bounded(self.store.find_by_id(id))
            .await?
            .ok_or_else(|| AuthError::InvalidToken("subject no longer exists".into()))
    }

    fn issue_for(&self, record: &CredentialRecord) -> Result<IssuedToken, AuthError> {
        let token = self.issuer.issue(IssueClaims::for_account(
            record.id.to_string(),
            record.is_creator(),
        ))?;
        Ok(IssuedToken {
            token,
            user: record.to_user(),
        })
    }

    /// Run a store call under the configured timeout.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, AuthError>>,
    ) -> Result<T, AuthError> {
        tokio::time::timeout(self.store_timeout, call)
            .await
            .map_err(|_| {
                AuthError::Unavailable(format!(
                    "credential store did not answer within {:?}",
                    self.store_timeout
                ))
            })?
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::auth::jwt::JwtSecret;
    use crate::models::auth::CreatorProfile;
    use crate::store::InMemoryCredentialStore;

    fn config() -> AuthConfig {
        let mut config = AuthConfig::new(JwtSecret::new("credentials-test-secret-0123456789").unwrap());
        config.bcrypt_cost = 4;
        config
    }

    fn service() -> (CredentialService, Arc<InMemoryCredentialStore>) {
        let store = Arc::new(InMemoryCredentialStore::new());
        let service = CredentialService::new(store.clone(), &config()).unwrap();
        (service, store)
    }

    fn alice() -> NewAccount {
        NewAccount {
            username: "alice".into(),
            email: "a@x.com".into(),
            password: "secret1".into(),
            is_creator: false,
        }
    }

    #[tokio::test]
    async fn register_verify_login_scenario() {
        let (service, _) = service();

        let t1 = service.register(alice()).await.unwrap();
        let claims = service.verifier().verify(&t1.token).unwrap();
        assert_eq!(claims.user_id(), t1.user.id);
        assert!(!claims.is_creator());

        let t2 = service.login("a@x.com", "secret1").await.unwrap();
        assert_ne!(t1.token, t2.token);
        let claims2 = service.verifier().verify(&t2.token).unwrap();
        assert_eq!(claims2.user_id(), t1.user.id);

        assert!(matches!(
            service.login("a@x.com", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn unknown_identity_and_wrong_password_look_the_same() {
        let (service, _) = service();
        service.register(alice()).await.unwrap();

        let wrong_password = service.login("a@x.com", "nope-nope").await.unwrap_err();
        let unknown = service.login("ghost@x.com", "secret1").await.unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let (service, store) = service();
        service.register(alice()).await.unwrap();

        let again = NewAccount {
            username: "alice2".into(),
            ..alice()
        };
        assert!(matches!(
            service.register(again).await,
            Err(AuthError::DuplicateIdentity)
        ));

        let same_name = NewAccount {
            email: "other@x.com".into(),
            ..alice()
        };
        assert!(matches!(
            service.register(same_name).await,
            Err(AuthError::DuplicateIdentity)
        ));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn email_is_normalised_for_register_and_login() {
        let (service, _) = service();
        let account = NewAccount {
            email: "  A@X.com ".into(),
            ..alice()
        };
        let issued = service.register(account).await.unwrap();
        assert_eq!(issued.user.email, "a@x.com");

        assert!(service.login("A@x.COM", "secret1").await.is_ok());
        assert!(service.login("alice", "secret1").await.is_ok());
    }

    #[tokio::test]
    async fn login_rejects_passwords_past_the_bcrypt_limit() {
        let (service, _) = service();
        let password = "p".repeat(MAX_PASSWORD_BYTES);
        service
            .register(NewAccount { password: password.clone(), ..alice() })
            .await
            .unwrap();

        assert!(service.login("a@x.com", &password).await.is_ok());
        let longer = format!("{password}-and-more");
        assert!(matches!(
            service.login("a@x.com", &longer).await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn registration_input_is_validated() {
        let (service, store) = service();
        let cases = [
            NewAccount { username: "al".into(), ..alice() },
            NewAccount { username: "al@ice".into(), ..alice() },
            NewAccount { email: "not-an-email".into(), ..alice() },
            NewAccount { email: "a@x".into(), ..alice() },
            NewAccount { password: "12345".into(), ..alice() },
            NewAccount { password: "x".repeat(MAX_PASSWORD_BYTES + 1), ..alice() },
        ];
        for account in cases {
            assert!(matches!(
                service.register(account).await,
                Err(AuthError::ValidationError(_))
            ));
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn password_is_stored_hashed() {
        let (service, store) = service();
        let issued = service.register(alice()).await.unwrap();
        let id = Uuid::parse_str(&issued.user.id).unwrap();
        let record = store.find_by_id(id).await.unwrap().unwrap();
        assert_ne!(record.password_hash, "secret1");
        assert!(record.password_hash.starts_with("$2"));
    }

    #[tokio::test]
    async fn creator_registration_initialises_profile() {
        let (service, _) = service();
        let issued = service
            .register(NewAccount {
                is_creator: true,
                ..alice()
            })
            .await
            .unwrap();

        assert!(issued.user.is_creator);
        assert_eq!(issued.user.creator_profile, Some(CreatorProfile::initial()));
        assert!(service.verifier().verify(&issued.token).unwrap().is_creator());
    }

    #[tokio::test]
    async fn creator_login_hides_member_accounts() {
        let (service, _) = service();
        service.register(alice()).await.unwrap();

        assert!(matches!(
            service.creator_login("a@x.com", "secret1").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn creator_login_refuses_rejected_creators() {
        let (service, store) = service();
        let issued = service
            .register(NewAccount {
                is_creator: true,
                ..alice()
            })
            .await
            .unwrap();

        let ok = service.creator_login("a@x.com", "secret1").await.unwrap();
        assert!(service.verifier().verify(&ok.token).unwrap().is_creator());

        let id = Uuid::parse_str(&issued.user.id).unwrap();
        let mut record = store.find_by_id(id).await.unwrap().unwrap();
        record.role = Role::Creator(CreatorProfile {
            verification_status: VerificationStatus::Rejected,
            ..CreatorProfile::initial()
        });
        store.save(&record).await.unwrap();

        assert!(matches!(
            service.creator_login("a@x.com", "secret1").await,
            Err(AuthError::Forbidden(_))
        ));
        // A wrong password still reads as bad credentials.
        assert!(matches!(
            service.creator_login("a@x.com", "wrong-one").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn promotion_is_reflected_in_new_token() {
        let (service, _) = service();
        let issued = service.register(alice()).await.unwrap();
        let claims = service.verifier().verify(&issued.token).unwrap();

        let promoted = service.promote_to_creator(&claims).await.unwrap();
        assert!(promoted.user.is_creator);
        assert!(service.verifier().verify(&promoted.token).unwrap().is_creator());

        // The old token still says member; a refresh picks up the new role.
        let refreshed = service.refresh(&issued.token).await.unwrap();
        assert!(service.verifier().verify(&refreshed.token).unwrap().is_creator());
    }

    #[tokio::test]
    async fn refresh_rejects_forged_tokens() {
        let (service, _) = service();
        let issued = service.register(alice()).await.unwrap();
        let forged = format!("{}x", issued.token);

        assert!(matches!(
            service.refresh(&forged).await,
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn refresh_rejects_tokens_for_unknown_accounts() {
        let (service, _) = service();
        let token = service
            .issuer()
            .issue(IssueClaims::for_account(Uuid::now_v7().to_string(), false))
            .unwrap();

        assert!(matches!(
            service.refresh(&token).await,
            Err(AuthError::InvalidToken(_))
        ));
    }

    /// Store whose lookups never finish.
    struct StalledStore;

    #[async_trait]
    impl CredentialStore for StalledStore {
        async fn find_by_email_or_username(
            &self,
            _email: &str,
            _username: &str,
        ) -> Result<Option<CredentialRecord>, AuthError> {
            std::future::pending().await
        }

        async fn find_by_id(&self, _id: Uuid) -> Result<Option<CredentialRecord>, AuthError> {
            std::future::pending().await
        }

        async fn create(&self, _c: NewCredential) -> Result<CredentialRecord, AuthError> {
            std::future::pending().await
        }

        async fn save(&self, _r: &CredentialRecord) -> Result<(), AuthError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_store_times_out() {
        let service = CredentialService::new(Arc::new(StalledStore), &config()).unwrap();
        assert!(matches!(
            service.login("a@x.com", "secret1").await,
            Err(AuthError::Unavailable(_))
        ));
    }
}
