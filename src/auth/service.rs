//! # Auth Service
//!
//! Sign-in, token checks and profile lookups for the back office.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use super::crypto::{hash_password, verify_password, PasswordPolicy};
use super::errors::{AuthError, AuthResult};
use super::jwt::{JwtClaims, JwtConfig, JwtManager, TokenResponse};
use super::profile::{Profile, Role, StoredProfile};
use crate::catalog::validation;
use crate::config::AuthConfig;
use crate::observability::Event;
use crate::store::{tables, BackingStore, RecordId, SelectQuery};

/// Result of a successful sign-in
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub user: Profile,
    pub session: TokenResponse,
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn BackingStore>,
    jwt: JwtManager,
    policy: PasswordPolicy,
}

impl AuthService {
    pub fn new(store: Arc<dyn BackingStore>, config: &AuthConfig) -> Self {
        Self {
            store,
            jwt: JwtManager::new(JwtConfig::from(config)),
            policy: PasswordPolicy::default(),
        }
    }

    pub fn jwt(&self) -> &JwtManager {
        &self.jwt
    }

    /// Check credentials and issue an access token
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<LoginResponse> {
        let email = email.trim().to_lowercase();

        let stored = match self.find_by_email(&email).await? {
            Some(stored) => stored,
            None => {
                tracing::warn!(event = %Event::AuthFailed, reason = "unknown_email", "sign-in rejected");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !verify_password(password, &stored.password_hash)? {
            tracing::warn!(event = %Event::AuthFailed, profile_id = %stored.id, reason = "bad_password", "sign-in rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let user = stored.into_profile();
        let session = self.jwt.generate_access_token(&user)?;
        tracing::info!(profile_id = %user.id, role = %user.role, "signed in");

        Ok(LoginResponse { user, session })
    }

    /// Claims of a valid token
    pub fn current_user(&self, token: &str) -> AuthResult<JwtClaims> {
        self.jwt.validate_token(token)
    }

    /// Profile behind a valid token
    pub async fn current_profile(&self, token: &str) -> AuthResult<Profile> {
        let claims = self.current_user(token)?;
        let row = self
            .store
            .get(tables::PROFILES, &RecordId::from(claims.sub.as_str()))
            .await?
            .ok_or(AuthError::ProfileNotFound)?;

        let stored: StoredProfile =
            serde_json::from_value(row).map_err(|e| AuthError::StorageError(e.to_string()))?;
        Ok(stored.into_profile())
    }

    /// Profile behind a valid admin token
    pub async fn require_admin(&self, token: &str) -> AuthResult<Profile> {
        let profile = self.current_profile(token).await?;
        if !profile.role.is_admin() {
            return Err(AuthError::Unauthorized);
        }
        Ok(profile)
    }

    pub async fn create_profile(
        &self,
        email: &str,
        password: &str,
        full_name: Option<String>,
        role: Role,
    ) -> AuthResult<Profile> {
        let email = validation::email(email).map_err(|_| AuthError::InvalidEmail)?;
        self.policy.validate(password)?;

        if self.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailAlreadyExists);
        }

        let row = json!({
            "email": email,
            "full_name": validation::optional(full_name),
            "role": role,
            "password_hash": hash_password(password)?,
        });
        let stored: StoredProfile = serde_json::from_value(self.store.insert(tables::PROFILES, row).await?)
            .map_err(|e| AuthError::StorageError(e.to_string()))?;

        Ok(stored.into_profile())
    }

    /// Create the configured admin unless a profile with that email exists.
    /// Returns whether a profile was created.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> AuthResult<bool> {
        let normalized = email.trim().to_lowercase();
        if self.find_by_email(&normalized).await?.is_some() {
            return Ok(false);
        }

        let profile = self
            .create_profile(&normalized, password, None, Role::Admin)
            .await?;
        tracing::info!(event = %Event::AdminBootstrapped, profile_id = %profile.id, "admin profile created");
        Ok(true)
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<StoredProfile>> {
        let rows = self
            .store
            .select(SelectQuery::new(tables::PROFILES).eq("email", email).limit(1))
            .await?;

        rows.into_iter()
            .next()
            .map(|row| serde_json::from_value(row).map_err(|e| AuthError::StorageError(e.to_string())))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> AuthService {
        let config = AuthConfig {
            jwt_secret: "unit_test_secret_0123456789".to_string(),
            ..AuthConfig::default()
        };
        AuthService::new(Arc::new(MemoryStore::catalog()), &config)
    }

    #[tokio::test]
    async fn test_sign_in_roundtrip() {
        let auth = service();
        auth.ensure_admin("Admin@Clinic.org", "correct horse").await.unwrap();

        let login = auth.sign_in("admin@clinic.org", "correct horse").await.unwrap();
        assert_eq!(login.user.role, Role::Admin);

        let profile = auth.require_admin(&login.session.access_token).await.unwrap();
        assert_eq!(profile.email, "admin@clinic.org");
    }

    #[tokio::test]
    async fn test_sign_in_rejects_bad_credentials() {
        let auth = service();
        auth.ensure_admin("admin@clinic.org", "correct horse").await.unwrap();

        assert_eq!(
            auth.sign_in("admin@clinic.org", "wrong horse").await.unwrap_err(),
            AuthError::InvalidCredentials
        );
        assert_eq!(
            auth.sign_in("nobody@clinic.org", "correct horse").await.unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[tokio::test]
    async fn test_staff_is_not_admin() {
        let auth = service();
        auth.create_profile("staff@clinic.org", "staffpass1", Some("Sam".into()), Role::Staff)
            .await
            .unwrap();

        let login = auth.sign_in("staff@clinic.org", "staffpass1").await.unwrap();
        assert!(auth.current_profile(&login.session.access_token).await.is_ok());
        assert_eq!(
            auth.require_admin(&login.session.access_token).await.unwrap_err(),
            AuthError::Unauthorized
        );
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let auth = service();
        assert!(auth.ensure_admin("admin@clinic.org", "correct horse").await.unwrap());
        assert!(!auth.ensure_admin("admin@clinic.org", "another pass").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_profile_validation() {
        let auth = service();
        assert_eq!(
            auth.create_profile("bad", "longenough", None, Role::Staff).await.unwrap_err(),
            AuthError::InvalidEmail
        );
        assert!(matches!(
            auth.create_profile("a@clinic.org", "short", None, Role::Staff).await,
            Err(AuthError::WeakPassword(_))
        ));

        auth.create_profile("a@clinic.org", "longenough", None, Role::Staff).await.unwrap();
        assert_eq!(
            auth.create_profile("A@clinic.org", "longenough", None, Role::Staff).await.unwrap_err(),
            AuthError::EmailAlreadyExists
        );
    }

    #[tokio::test]
    async fn test_garbage_token() {
        let auth = service();
        assert!(auth.current_profile("not-a-token").await.is_err());
    }
}
