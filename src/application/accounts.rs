//! Registration, login sessions, and profile ownership.

use std::sync::Arc;

use bcrypt::{DEFAULT_COST, hash, verify};
use rand::Rng;
use thiserror::Error;
use time::{Duration, OffsetDateTime};

use crate::application::repos::{
    NewSessionParams, NewUserParams, RepoError, SessionsRepo, UpdateProfileParams, UsersRepo,
    UsersWriteRepo,
};
use crate::domain::entities::{SessionRecord, UserRecord};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_USERNAME_LENGTH: usize = 150;

/// Generate a cryptographically random 32-byte hex token.
pub fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.r#gen();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("username is already taken")]
    UsernameTaken,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("invalid account data: {0}")]
    Validation(String),
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UsersRepo>,
    users_write: Arc<dyn UsersWriteRepo>,
    sessions: Arc<dyn SessionsRepo>,
    session_ttl: Duration,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        users_write: Arc<dyn UsersWriteRepo>,
        sessions: Arc<dyn SessionsRepo>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            users,
            users_write,
            sessions,
            session_ttl,
        }
    }

    pub async fn register(
        &self,
        username: &str,
        password: &str,
        password_confirm: &str,
    ) -> Result<UserRecord, AccountError> {
        let username = username.trim();
        validate_username(username)?;

        if password.len() < MIN_PASSWORD_LENGTH {
            return Err(AccountError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }
        if password != password_confirm {
            return Err(AccountError::Validation("passwords do not match".into()));
        }

        if self.users.find_user_by_username(username).await?.is_some() {
            return Err(AccountError::UsernameTaken);
        }

        let password_hash =
            hash(password, DEFAULT_COST).map_err(|err| AccountError::Hash(err.to_string()))?;

        let user = self
            .users_write
            .create_user(NewUserParams {
                username: username.to_string(),
                password_hash,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => AccountError::UsernameTaken,
                other => AccountError::Repo(other),
            })?;

        Ok(user)
    }

    /// Verify credentials and open a session. Lookup and verification
    /// failures collapse into one error so usernames cannot be probed.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(UserRecord, SessionRecord), AccountError> {
        let user = self
            .users
            .find_user_by_username(username.trim())
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        let matches = verify(password, &user.password_hash)
            .map_err(|err| AccountError::Hash(err.to_string()))?;
        if !matches {
            return Err(AccountError::InvalidCredentials);
        }

        let session = self
            .sessions
            .create_session(NewSessionParams {
                token: generate_token(),
                user_id: user.id,
                expires_at: OffsetDateTime::now_utc() + self.session_ttl,
            })
            .await?;

        Ok((user, session))
    }

    pub async fn logout(&self, token: &str) -> Result<(), AccountError> {
        self.sessions.delete_session(token).await?;
        Ok(())
    }

    pub async fn update_profile(
        &self,
        current: &UserRecord,
        update: ProfileUpdate,
    ) -> Result<UserRecord, AccountError> {
        let username = update.username.trim().to_string();
        validate_username(&username)?;

        if username != current.username
            && self.users.find_user_by_username(&username).await?.is_some()
        {
            return Err(AccountError::UsernameTaken);
        }

        let user = self
            .users_write
            .update_profile(UpdateProfileParams {
                id: current.id,
                username,
                first_name: update.first_name.trim().to_string(),
                last_name: update.last_name.trim().to_string(),
                email: update.email.trim().to_string(),
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => AccountError::UsernameTaken,
                other => AccountError::Repo(other),
            })?;

        Ok(user)
    }
}

fn validate_username(username: &str) -> Result<(), AccountError> {
    if username.is_empty() {
        return Err(AccountError::Validation("username must not be empty".into()));
    }
    if username.len() > MAX_USERNAME_LENGTH {
        return Err(AccountError::Validation(format!(
            "username must be at most {MAX_USERNAME_LENGTH} characters"
        )));
    }
    if !username
        .chars()
        .all(|ch| ch.is_alphanumeric() || matches!(ch, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(AccountError::Validation(
            "username may contain letters, digits and @/./+/-/_ only".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generate_token_is_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn usernames_are_validated() {
        assert!(validate_username("maria.p").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"x".repeat(151)).is_err());
    }
}
