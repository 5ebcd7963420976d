//! Account registration, login and profile lookup

use crate::auth::{hash_password, verify_password, JwtManager};
use crate::db::models::User;
use crate::db::Repository;
use crate::errors::{AppError, Result};
use crate::metrics;
use serde::Serialize;
use std::sync::Arc;

pub const DEMO_EMAIL: &str = "demo@example.com";
pub const DEMO_PASSWORD: &str = "demo123";
const DEMO_NAME: &str = "Demo User";
const DEMO_COMPANY: &str = "Demo Company";

/// Fields accepted at registration
#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub company: Option<String>,
}

/// User fields returned alongside a credential
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub company: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            company: user.company.clone().unwrap_or_default(),
        }
    }
}

/// Full profile of the current user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub bio: Option<String>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            company: user.company,
            phone: user.phone,
            address: user.address,
            bio: user.bio,
        }
    }
}

/// A freshly issued credential
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: UserSummary,
}

pub struct AccountService {
    repo: Repository,
    jwt: Arc<JwtManager>,
}

impl AccountService {
    pub fn new(repo: Repository, jwt: Arc<JwtManager>) -> Self {
        Self { repo, jwt }
    }

    /// Create an account and issue its first credential
    pub async fn register(&self, input: RegisterInput) -> Result<AuthSession> {
        let (Some(name), Some(email), Some(password)) = (
            present(input.name),
            present(input.email),
            present(input.password),
        ) else {
            return Err(AppError::MissingField {
                fields: "name, email, password".to_string(),
            });
        };

        if self.repo.count_users_by_email(&email).await? > 0 {
            return Err(AppError::Duplicate {
                message: "Email already exists".to_string(),
            });
        }

        let password_hash = hash_blocking(password).await?;
        let company = input.company.unwrap_or_default();
        let user = self
            .repo
            .create_user(name, email, password_hash, Some(company))
            .await?;

        let token = self.jwt.generate_token(user.id)?;
        metrics::record_registration();
        tracing::info!(user_id = user.id, "User registered");

        Ok(AuthSession {
            token,
            user: UserSummary::from(&user),
        })
    }

    /// Exchange email and password for a credential
    pub async fn login(&self, email: Option<String>, password: Option<String>) -> Result<AuthSession> {
        let (Some(email), Some(password)) = (present(email), present(password)) else {
            return Err(AppError::Validation {
                message: "Missing email or password".to_string(),
                field: None,
            });
        };

        let Some(user) = self.repo.find_user_by_email(&email).await? else {
            metrics::record_login(false);
            return Err(AppError::InvalidCredentials);
        };

        let stored = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
            .await
            .map_err(|e| AppError::Internal {
                message: format!("Password verification task failed: {}", e),
            })?;

        if !matches {
            metrics::record_login(false);
            tracing::warn!(user_id = user.id, "Login rejected");
            return Err(AppError::InvalidCredentials);
        }

        let token = self.jwt.generate_token(user.id)?;
        metrics::record_login(true);
        tracing::info!(user_id = user.id, "User logged in");

        Ok(AuthSession {
            token,
            user: UserSummary::from(&user),
        })
    }

    pub async fn current_user(&self, user_id: i64) -> Result<UserProfile> {
        self.repo
            .find_user_by_id(user_id)
            .await?
            .map(UserProfile::from)
            .ok_or(AppError::UserNotFound { id: user_id })
    }

    /// Create the demo account if it does not exist yet
    pub async fn ensure_demo_user(&self) -> Result<()> {
        if self.repo.count_users_by_email(DEMO_EMAIL).await? > 0 {
            return Ok(());
        }

        let password_hash = hash_blocking(DEMO_PASSWORD.to_string()).await?;
        let user = self
            .repo
            .create_user(
                DEMO_NAME.to_string(),
                DEMO_EMAIL.to_string(),
                password_hash,
                Some(DEMO_COMPANY.to_string()),
            )
            .await?;

        tracing::info!(user_id = user.id, email = DEMO_EMAIL, "Demo user created");
        Ok(())
    }
}

/// Blank strings count as absent
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

async fn hash_blocking(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal {
            message: format!("Password hashing task failed: {}", e),
        })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbPool;

    async fn service() -> (AccountService, Repository, Arc<JwtManager>) {
        let repo = Repository::new(DbPool::in_memory().await.unwrap());
        let jwt = Arc::new(JwtManager::new("test-secret", 3600));
        (AccountService::new(repo.clone(), jwt.clone()), repo, jwt)
    }

    fn alice() -> RegisterInput {
        RegisterInput {
            name: Some("Alice".into()),
            email: Some("alice@example.com".into()),
            password: Some("hunter22".into()),
            company: None,
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (accounts, _, jwt) = service().await;

        let registered = accounts.register(alice()).await.unwrap();
        assert_eq!(registered.user.company, "");
        assert_eq!(jwt.verify(&registered.token), Ok(registered.user.id));

        let session = accounts
            .login(Some("alice@example.com".into()), Some("hunter22".into()))
            .await
            .unwrap();
        assert_eq!(session.user, registered.user);
        assert_eq!(jwt.verify(&session.token), Ok(registered.user.id));
    }

    #[tokio::test]
    async fn test_duplicate_email_keeps_single_row() {
        let (accounts, repo, _) = service().await;
        accounts.register(alice()).await.unwrap();

        let err = accounts.register(alice()).await.unwrap_err();
        assert!(matches!(err, AppError::Duplicate { .. }));
        assert_eq!(err.to_string(), "Email already exists");
        assert_eq!(repo.count_users_by_email("alice@example.com").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_register_requires_fields() {
        let (accounts, _, _) = service().await;

        let mut input = alice();
        input.password = Some("   ".into());
        let err = accounts.register(input).await.unwrap_err();
        assert!(matches!(err, AppError::MissingField { .. }));

        let err = accounts.register(RegisterInput::default()).await.unwrap_err();
        assert!(matches!(err, AppError::MissingField { .. }));
    }

    #[tokio::test]
    async fn test_login_failures() {
        let (accounts, _, _) = service().await;
        accounts.register(alice()).await.unwrap();

        let wrong_password = accounts
            .login(Some("alice@example.com".into()), Some("nope".into()))
            .await
            .unwrap_err();
        assert!(matches!(wrong_password, AppError::InvalidCredentials));

        let unknown = accounts
            .login(Some("bob@example.com".into()), Some("hunter22".into()))
            .await
            .unwrap_err();
        assert!(matches!(unknown, AppError::InvalidCredentials));

        let missing = accounts.login(None, Some("hunter22".into())).await.unwrap_err();
        assert_eq!(missing.to_string(), "Missing email or password");
    }

    #[tokio::test]
    async fn test_current_user_profile() {
        let (accounts, _, _) = service().await;
        let session = accounts.register(alice()).await.unwrap();

        let profile = accounts.current_user(session.user.id).await.unwrap();
        assert_eq!(profile.email, "alice@example.com");
        assert_eq!(profile.company.as_deref(), Some(""));
        assert_eq!(profile.phone, None);

        let err = accounts.current_user(session.user.id + 100).await.unwrap_err();
        assert!(matches!(err, AppError::UserNotFound { .. }));
    }

    #[tokio::test]
    async fn test_demo_user_is_created_once() {
        let (accounts, repo, _) = service().await;

        accounts.ensure_demo_user().await.unwrap();
        accounts.ensure_demo_user().await.unwrap();
        assert_eq!(repo.count_users_by_email(DEMO_EMAIL).await.unwrap(), 1);

        let session = accounts
            .login(Some(DEMO_EMAIL.into()), Some(DEMO_PASSWORD.into()))
            .await
            .unwrap();
        assert_eq!(session.user.company, "Demo Company");
    }
}
