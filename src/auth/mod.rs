//! JWT issuance/validation, password hashing and the request guards
//! that enforce the role table in [`permissions`].

use crate::{config::AppConfig, entities::user::Model as UserModel, errors::ServiceError};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

pub mod permissions;

use permissions::Role;

pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    use argon2::password_hash::rand_core::OsRng;
    use argon2::password_hash::SaltString;
    use argon2::{Argon2, PasswordHasher};

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ServiceError::HashError(e.to_string()))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub username: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated user data extracted from the JWT token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Clone)]
pub struct AuthService {
    jwt_secret: String,
    token_ttl_secs: i64,
}

impl AuthService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
            token_ttl_secs: config.jwt_expiration as i64,
        }
    }

    /// Signs an HS256 token carrying the user's id, username and role.
    pub fn issue_token(&self, user: &UserModel) -> Result<TokenResponse, ServiceError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role.clone(),
            iat: now,
            exp: now + self.token_ttl_secs,
        };

        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::JwtError(e.to_string()))?;

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.token_ttl_secs,
        })
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ServiceError::Unauthorized("Token has expired".to_string())
            }
            _ => ServiceError::Unauthorized("Invalid authentication token".to_string()),
        })
    }

    /// Turns validated claims into the typed user the guards work with.
    pub fn authenticated_user(&self, claims: Claims) -> Result<AuthUser, ServiceError> {
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ServiceError::Unauthorized("Invalid authentication token".to_string()))?;
        let role = Role::from_str(&claims.role)
            .map_err(|_| ServiceError::Unauthorized("Invalid authentication token".to_string()))?;
        Ok(AuthUser {
            user_id,
            username: claims.username,
            role,
        })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Validates the Authorization header and stores the [`AuthUser`] in the
/// request extensions for handlers and the role guard.
pub async fn auth_middleware(
    State(auth): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| ServiceError::Unauthorized("Authentication required".to_string()))?;

    let claims = auth.validate_token(token)?;
    let user = auth.authenticated_user(claims)?;

    debug!(user_id = %user.user_id, role = %user.role, "Authenticated request");
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Enforces the path-prefix role table. Runs after `auth_middleware`.
pub async fn role_guard(request: Request, next: Next) -> Result<Response, ServiceError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ServiceError::Unauthorized("Authentication required".to_string()))?;

    let path = request.uri().path();
    if !permissions::authorize(user.role, path, request.method()) {
        return Err(ServiceError::Forbidden(format!(
            "Role {} is not allowed to access this resource",
            user.role
        )));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn test_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".into(),
            "unit_test_signing_key_0123456789_abcdefghijklmnopqrstuvwxyz_ZYXWV".into(),
            3600,
            "127.0.0.1".into(),
            8080,
            "development".into(),
        )
    }

    fn test_user() -> UserModel {
        UserModel {
            id: Uuid::new_v4(),
            username: "budi".to_string(),
            password_hash: "unused".to_string(),
            full_name: "Budi Santoso".to_string(),
            role: Role::Finance.to_string(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("kata-sandi-rahasia").unwrap();
        assert!(verify_password("kata-sandi-rahasia", &hash));
        assert!(!verify_password("kata-sandi-salah", &hash));
    }

    #[test]
    fn verify_rejects_garbage_hashes() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn token_round_trip_preserves_identity() {
        let service = AuthService::new(&test_config());
        let user = test_user();

        let token = service.issue_token(&user).unwrap();
        assert_eq!(token.token_type, "Bearer");

        let claims = service.validate_token(&token.access_token).unwrap();
        let auth_user = service.authenticated_user(claims).unwrap();
        assert_eq!(auth_user.user_id, user.id);
        assert_eq!(auth_user.username, "budi");
        assert_eq!(auth_user.role, Role::Finance);
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let service = AuthService::new(&test_config());
        let mut other_config = test_config();
        other_config.jwt_secret =
            "another_signing_key_9876543210_abcdefghijklmnopqrstuvwxyz_ZYXWV".into();
        let other = AuthService::new(&other_config);

        let token = other.issue_token(&test_user()).unwrap();
        assert_matches!(
            service.validate_token(&token.access_token),
            Err(ServiceError::Unauthorized(_))
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let service = AuthService::new(&test_config());
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            username: "budi".to_string(),
            role: Role::Sales.to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(test_config().jwt_secret.as_bytes()),
        )
        .unwrap();

        let err = service.validate_token(&token).unwrap_err();
        assert_matches!(err, ServiceError::Unauthorized(msg) if msg.contains("expired"));
    }

    #[test]
    fn claims_with_unknown_role_are_rejected() {
        let service = AuthService::new(&test_config());
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            username: "budi".to_string(),
            role: "SUPERUSER".to_string(),
            iat: 0,
            exp: 0,
        };
        assert!(service.authenticated_user(claims).is_err());
    }
}
