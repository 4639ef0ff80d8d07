//! User service
//!
//! Signup, login, logout and session validation. The first account ever
//! registered becomes staff; everyone after that is a member.

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::forms::{Credentials, FieldErrors, Registration};
use crate::models::{Session, User, UserRole};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use chrono::Duration;
use std::sync::Arc;

/// Default session lifetime in days
const DEFAULT_SESSION_DAYS: i64 = 14;

pub const USERNAME_TAKEN: &str = "A user with that username already exists.";
pub const EMAIL_TAKEN: &str = "A user is already registered with this email address.";
pub const BAD_CREDENTIALS: &str = "The username and/or password you specified are not correct.";

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Signup rejected on a per-field basis
    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_days: i64,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>, session_repo: Arc<dyn SessionRepository>) -> Self {
        Self::with_session_days(user_repo, session_repo, DEFAULT_SESSION_DAYS)
    }

    /// Create a user service with a custom session lifetime
    pub fn with_session_days(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_days,
        }
    }

    /// Register a new account from a validated signup form.
    ///
    /// # Errors
    ///
    /// - `ValidationError` if the username or email is already taken
    /// - `InternalError` for database errors
    pub async fn register(&self, input: Registration) -> Result<User, UserServiceError> {
        let mut errors = FieldErrors::new();

        if self
            .user_repo
            .get_by_username(&input.username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            errors.add("username", USERNAME_TAKEN);
        }

        if self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            errors.add("email", EMAIL_TAKEN);
        }

        if !errors.is_empty() {
            return Err(UserServiceError::ValidationError(errors));
        }

        let role = if self.is_first_user().await? {
            UserRole::Staff
        } else {
            UserRole::Member
        };

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = User::new(input.username, input.email, password_hash, role);

        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        tracing::info!(user_id = created.id, role = %created.role, "Registered user {}", created.username);
        Ok(created)
    }

    /// Check credentials and open a session.
    ///
    /// The username field also accepts an email address.
    pub async fn login(&self, input: Credentials) -> Result<(Session, User), UserServiceError> {
        let user = match self.find_user_by_username_or_email(&input.username).await? {
            Some(user) => user,
            None => {
                tracing::warn!("Login failed for unknown user {}", input.username);
                return Err(UserServiceError::AuthenticationError(BAD_CREDENTIALS.to_string()));
            }
        };

        let password_valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !password_valid {
            tracing::warn!(user_id = user.id, "Login failed: wrong password");
            return Err(UserServiceError::AuthenticationError(BAD_CREDENTIALS.to_string()));
        }

        let session = Session::start(user.id, Duration::days(self.session_days));
        let session = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        Ok((session, user))
    }

    /// Logout (invalidate session)
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// Unknown and expired tokens yield `None`; expired sessions are removed.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to remove expired session: {:#}", e);
            }
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user)
    }

    /// Check if no account exists yet
    pub async fn is_first_user(&self) -> Result<bool, UserServiceError> {
        let count = self
            .user_repo
            .count()
            .await
            .context("Failed to count users")?;
        Ok(count == 0)
    }

    /// Delete all expired sessions
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        Ok(count)
    }

    async fn find_user_by_username_or_email(
        &self,
        username_or_email: &str,
    ) -> Result<Option<User>, UserServiceError> {
        if let Some(user) = self
            .user_repo
            .get_by_username(username_or_email)
            .await
            .context("Failed to get user by username")?
        {
            return Ok(Some(user));
        }

        let user = self
            .user_repo
            .get_by_email(username_or_email)
            .await
            .context("Failed to get user by email")?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};
    use proptest::prelude::*;

    async fn setup_test_service(session_days: i64) -> UserService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        UserService::with_session_days(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
            session_days,
        )
    }

    fn registration(username: &str) -> Registration {
        Registration {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: "lift-heavy-things".to_string(),
        }
    }

    fn credentials(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_user_becomes_staff() {
        let service = setup_test_service(14).await;
        assert!(service.is_first_user().await.unwrap());

        let first = service.register(registration("coach")).await.unwrap();
        let second = service.register(registration("athlete")).await.unwrap();

        assert_eq!(first.role, UserRole::Staff);
        assert_eq!(second.role, UserRole::Member);
        assert!(!service.is_first_user().await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_username_and_email_are_field_errors() {
        let service = setup_test_service(14).await;
        service.register(registration("coach")).await.unwrap();

        match service.register(registration("coach")).await {
            Err(UserServiceError::ValidationError(errors)) => {
                assert_eq!(errors.get("username"), [USERNAME_TAKEN]);
                assert_eq!(errors.get("email"), [EMAIL_TAKEN]);
            }
            other => panic!("expected validation error, got {:?}", other.map(|u| u.id)),
        }
    }

    #[tokio::test]
    async fn test_login_with_username_or_email() {
        let service = setup_test_service(14).await;
        let user = service.register(registration("coach")).await.unwrap();

        let (session, logged_in) = service
            .login(credentials("coach", "lift-heavy-things"))
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);
        assert_eq!(session.user_id, user.id);

        let (_, by_email) = service
            .login(credentials("coach@example.com", "lift-heavy-things"))
            .await
            .unwrap();
        assert_eq!(by_email.id, user.id);
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() {
        let service = setup_test_service(14).await;
        service.register(registration("coach")).await.unwrap();

        assert!(matches!(
            service.login(credentials("coach", "nope")).await,
            Err(UserServiceError::AuthenticationError(_))
        ));
        assert!(matches!(
            service.login(credentials("ghost", "lift-heavy-things")).await,
            Err(UserServiceError::AuthenticationError(_))
        ));
    }

    #[tokio::test]
    async fn test_validate_and_logout() {
        let service = setup_test_service(14).await;
        service.register(registration("coach")).await.unwrap();
        let (session, _) = service
            .login(credentials("coach", "lift-heavy-things"))
            .await
            .unwrap();

        let user = service.validate_session(&session.id).await.unwrap();
        assert_eq!(user.map(|u| u.username), Some("coach".to_string()));

        service.logout(&session.id).await.unwrap();
        assert!(service.validate_session(&session.id).await.unwrap().is_none());
        assert!(service.validate_session("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected() {
        let service = setup_test_service(-1).await;
        service.register(registration("coach")).await.unwrap();
        let (session, _) = service
            .login(credentials("coach", "lift-heavy-things"))
            .await
            .unwrap();

        assert!(service.validate_session(&session.id).await.unwrap().is_none());
        assert_eq!(service.cleanup_expired_sessions().await.unwrap(), 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(8))]

        #[test]
        fn login_round_trips_to_the_registered_user(
            username in "[a-z]{3,10}",
            password in "[a-zA-Z0-9!@#$%^&*]{8,20}",
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let result: Result<(), TestCaseError> = rt.block_on(async {
                let service = setup_test_service(14).await;
                let registered = service
                    .register(Registration {
                        username: username.clone(),
                        email: format!("{}@example.com", username),
                        password: password.clone(),
                    })
                    .await
                    .expect("Registration should succeed");

                let (session, _) = service
                    .login(credentials(&username, &password))
                    .await
                    .expect("Login should succeed");

                let validated = service
                    .validate_session(&session.id)
                    .await
                    .expect("Validation should not error")
                    .expect("Session should be valid");

                prop_assert_eq!(validated.id, registered.id);
                prop_assert_eq!(validated.username, registered.username);
                Ok(())
            });
            result?;
        }
    }
}
