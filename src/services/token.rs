//! Signed token issuance and verification.
//!
//! Access and refresh tokens are HS256 JWTs signed with the configured
//! secret. Password-reset tokens are signed with the secret concatenated
//! with the user's current password hash, so redeeming a token (or any
//! password change) invalidates every token issued before it.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AuthConfig;
use crate::entities::users;

pub const TOKEN_TYPE_ACCESS: &str = "access";
pub const TOKEN_TYPE_REFRESH: &str = "refresh";
pub const TOKEN_TYPE_RESET: &str = "password_reset";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token is invalid or has expired")]
    Invalid,

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

/// Claims carried by access and refresh tokens. Role rides along so
/// downstream permission checks avoid a user lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,
    pub username: String,
    pub role: String,
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ResetClaims {
    sub: i32,
    token_type: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

pub struct TokenService {
    secret: String,
    access_minutes: i64,
    refresh_days: i64,
    reset_minutes: i64,
}

impl TokenService {
    #[must_use]
    pub fn new(auth: &AuthConfig) -> Self {
        Self {
            secret: auth.jwt_secret.clone(),
            access_minutes: auth.access_token_minutes,
            refresh_days: auth.refresh_token_days,
            reset_minutes: auth.reset_token_minutes,
        }
    }

    pub fn issue_pair(&self, user: &users::Model) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access: self.issue(user, TOKEN_TYPE_ACCESS, self.access_minutes * 60)?,
            refresh: self.issue(user, TOKEN_TYPE_REFRESH, self.refresh_days * 86_400)?,
        })
    }

    /// Issue a fresh access token from validated refresh claims.
    pub fn issue_access_from_claims(&self, claims: &Claims) -> Result<String, TokenError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: claims.sub,
            username: claims.username.clone(),
            role: claims.role.clone(),
            token_type: TOKEN_TYPE_ACCESS.to_string(),
            iat: now,
            exp: now + self.access_minutes * 60,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn decode_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.decode_typed(token, TOKEN_TYPE_ACCESS)
    }

    pub fn decode_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        self.decode_typed(token, TOKEN_TYPE_REFRESH)
    }

    /// Issue a single-use reset token bound to the user's current password
    /// hash.
    pub fn issue_reset_token(&self, user: &users::Model) -> Result<String, TokenError> {
        let now = chrono::Utc::now().timestamp();
        let claims = ResetClaims {
            sub: user.id,
            token_type: TOKEN_TYPE_RESET.to_string(),
            iat: now,
            exp: now + self.reset_minutes * 60,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.reset_key(user).as_bytes()),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify a reset token against the target user's current state.
    pub fn verify_reset_token(&self, token: &str, user: &users::Model) -> Result<(), TokenError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<ResetClaims>(
            token,
            &DecodingKey::from_secret(self.reset_key(user).as_bytes()),
            &validation,
        )
        .map_err(|_| TokenError::Invalid)?;

        if data.claims.token_type != TOKEN_TYPE_RESET || data.claims.sub != user.id {
            return Err(TokenError::Invalid);
        }

        Ok(())
    }

    /// URL-safe opaque encoding of a user id, for reset links.
    #[must_use]
    pub fn encode_uid(id: i32) -> String {
        use base64::Engine;
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(id.to_string())
    }

    #[must_use]
    pub fn decode_uid(encoded: &str) -> Option<i32> {
        use base64::Engine;
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(encoded)
            .ok()?;
        String::from_utf8(bytes).ok()?.parse().ok()
    }

    fn issue(
        &self,
        user: &users::Model,
        token_type: &str,
        lifetime_seconds: i64,
    ) -> Result<String, TokenError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            role: user.role.clone(),
            token_type: token_type.to_string(),
            iat: now,
            exp: now + lifetime_seconds,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn decode_typed(&self, token: &str, expected_type: &str) -> Result<Claims, TokenError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|_| TokenError::Invalid)?;

        if data.claims.token_type != expected_type {
            return Err(TokenError::Invalid);
        }

        Ok(data.claims)
    }

    fn reset_key(&self, user: &users::Model) -> String {
        format!("{}:{}", self.secret, user.password_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> TokenService {
        TokenService::new(&AuthConfig::default())
    }

    fn test_user() -> users::Model {
        users::Model {
            id: 7,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "$argon2id$fakehash".to_string(),
            role: "instructor".to_string(),
            avatar: None,
            is_active: true,
            date_joined: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_access_round_trip() {
        let svc = test_service();
        let pair = svc.issue_pair(&test_user()).unwrap();

        let claims = svc.decode_access(&pair.access).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, "instructor");
    }

    #[test]
    fn test_refresh_not_accepted_as_access() {
        let svc = test_service();
        let pair = svc.issue_pair(&test_user()).unwrap();

        assert!(svc.decode_access(&pair.refresh).is_err());
        assert!(svc.decode_refresh(&pair.access).is_err());
        assert!(svc.decode_refresh(&pair.refresh).is_ok());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let svc = test_service();
        assert!(svc.decode_access("not-a-token").is_err());
        assert!(svc.decode_access("").is_err());
    }

    #[test]
    fn test_reset_token_bound_to_password_hash() {
        let svc = test_service();
        let user = test_user();
        let token = svc.issue_reset_token(&user).unwrap();

        assert!(svc.verify_reset_token(&token, &user).is_ok());

        // Changing the password hash invalidates the outstanding token.
        let mut changed = user;
        changed.password_hash = "$argon2id$differenthash".to_string();
        assert!(svc.verify_reset_token(&token, &changed).is_err());
    }

    #[test]
    fn test_reset_token_rejected_for_other_user() {
        let svc = test_service();
        let user = test_user();
        let token = svc.issue_reset_token(&user).unwrap();

        let mut other = test_user();
        other.id = 8;
        assert!(svc.verify_reset_token(&token, &other).is_err());
    }

    #[test]
    fn test_uid_round_trip() {
        let encoded = TokenService::encode_uid(42);
        assert_eq!(TokenService::decode_uid(&encoded), Some(42));
        assert_eq!(TokenService::decode_uid("!!!"), None);
    }
}
