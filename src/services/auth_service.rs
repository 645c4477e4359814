//! Domain service for accounts, credentials, and the password-reset flow.

use thiserror::Error;

use crate::db::ProfileUpdate;
use crate::domain::Role;
use crate::entities::users;
use crate::services::token::{TokenError, TokenPair};

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Every password-reset-confirm failure collapses into this one message
    /// so the response does not reveal which check failed.
    #[error("Token is invalid or has expired")]
    InvalidResetToken,

    #[error("User not found")]
    UserNotFound,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => Self::InvalidCredentials,
            TokenError::Signing(msg) => Self::Internal(msg),
        }
    }
}

/// Input for account registration. The role is client-controlled and
/// defaults to student.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Domain service trait for accounts and credentials.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an account with a hashed password.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] on duplicate username/email.
    async fn register(&self, input: RegisterInput) -> Result<users::Model, AuthError>;

    /// Verifies credentials and issues an access/refresh token pair.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] regardless of whether the
    /// username exists.
    async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError>;

    /// Exchanges a valid refresh token for a new access token.
    async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError>;

    /// Gets the caller's own record.
    async fn get_profile(&self, user_id: i32) -> Result<users::Model, AuthError>;

    /// Applies a partial update to the caller's own record.
    async fn update_profile(
        &self,
        user_id: i32,
        update: ProfileUpdate,
    ) -> Result<users::Model, AuthError>;

    /// Dispatches a reset link if the email belongs to a user. Always
    /// succeeds from the caller's perspective to prevent enumeration.
    async fn request_password_reset(&self, email: &str) -> Result<(), AuthError>;

    /// Redeems a reset token and overwrites the password hash.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidResetToken`] for every validation
    /// failure: undecodable uid, unknown user, bad signature, or expiry.
    async fn confirm_password_reset(
        &self,
        uidb64: &str,
        token: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;
}
