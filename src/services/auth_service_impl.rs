//! `SeaORM` implementation of the `AuthService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::config::{AuthConfig, EmailConfig, SecurityConfig};
use crate::db::{NewUser, ProfileUpdate, Store};
use crate::entities::users;
use crate::services::auth_service::{AuthError, AuthService, RegisterInput};
use crate::services::mailer::Mailer;
use crate::services::token::{TokenPair, TokenService};

pub struct SeaOrmAuthService {
    store: Store,
    tokens: Arc<TokenService>,
    mailer: Arc<dyn Mailer>,
    security: SecurityConfig,
    reset_link_base: String,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(
        store: Store,
        tokens: Arc<TokenService>,
        mailer: Arc<dyn Mailer>,
        security: SecurityConfig,
        auth: &AuthConfig,
        _email: &EmailConfig,
    ) -> Self {
        Self {
            store,
            tokens,
            mailer,
            security,
            reset_link_base: auth.reset_link_base.clone(),
        }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, input: RegisterInput) -> Result<users::Model, AuthError> {
        if self
            .store
            .get_user_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AuthError::Validation(
                "A user with that username already exists".to_string(),
            ));
        }

        if self.store.get_user_by_email(&input.email).await?.is_some() {
            return Err(AuthError::Validation(
                "A user with that email already exists".to_string(),
            ));
        }

        let user = self
            .store
            .create_user(
                NewUser {
                    username: input.username,
                    email: input.email,
                    password: input.password,
                    role: input.role,
                },
                Some(&self.security),
            )
            .await?;

        Ok(user)
    }

    async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        let user = self
            .store
            .verify_credentials(username, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        Ok(self.tokens.issue_pair(&user)?)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let claims = self.tokens.decode_refresh(refresh_token)?;
        Ok(self.tokens.issue_access_from_claims(&claims)?)
    }

    async fn get_profile(&self, user_id: i32) -> Result<users::Model, AuthError> {
        self.store
            .get_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    async fn update_profile(
        &self,
        user_id: i32,
        update: ProfileUpdate,
    ) -> Result<users::Model, AuthError> {
        if let Some(username) = &update.username
            && let Some(existing) = self.store.get_user_by_username(username).await?
            && existing.id != user_id
        {
            return Err(AuthError::Validation(
                "A user with that username already exists".to_string(),
            ));
        }

        if let Some(email) = &update.email
            && let Some(existing) = self.store.get_user_by_email(email).await?
            && existing.id != user_id
        {
            return Err(AuthError::Validation(
                "A user with that email already exists".to_string(),
            ));
        }

        Ok(self.store.update_profile(user_id, update).await?)
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let Some(user) = self.store.get_user_by_email(email).await? else {
            // Respond identically whether or not the account exists.
            return Ok(());
        };

        let token = self.tokens.issue_reset_token(&user)?;
        let uidb64 = TokenService::encode_uid(user.id);
        let reset_link = format!("{}/{}/{}", self.reset_link_base, uidb64, token);

        let body = format!("Click the link to reset your password: {reset_link}");
        if let Err(e) = self
            .mailer
            .send(email, "Password Reset Request", &body)
            .await
        {
            // Delivery failures must not change the response shape.
            warn!("Failed to dispatch password reset mail: {e}");
        }

        Ok(())
    }

    async fn confirm_password_reset(
        &self,
        uidb64: &str,
        token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let user_id = TokenService::decode_uid(uidb64).ok_or(AuthError::InvalidResetToken)?;

        let user = self
            .store
            .get_user_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        self.tokens
            .verify_reset_token(token, &user)
            .map_err(|_| AuthError::InvalidResetToken)?;

        if new_password.len() < 8 {
            return Err(AuthError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        self.store
            .update_user_password(user.id, new_password, Some(&self.security))
            .await?;

        Ok(())
    }
}
