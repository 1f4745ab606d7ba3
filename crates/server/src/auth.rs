//! Bearer tokens: HS256 JWTs whose claims are the caller's identity.
//!
//! The token is the whole session. Each request rebuilds an [`Actor`] from it
//! and hands that value to the service explicitly.

use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{DateTime, Duration, Utc};
use fleetgate_core::config::{AuthConfig, MAX_TOKEN_TTL_SECS};
use fleetgate_core::domain::user::{Actor, Role, User, UserId};
use fleetgate_core::errors::ApplicationError;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{ApiError, CorrelationId};
use crate::state::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("authorization header is not a bearer token")]
    NotBearer,
    #[error("token has expired")]
    Expired,
    #[error("token is invalid: {0}")]
    Invalid(String),
    #[error("token could not be signed: {0}")]
    Signing(String),
}

impl From<AuthError> for ApplicationError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::Signing(message) => ApplicationError::Configuration(message),
            other => ApplicationError::Authentication(other.to_string()),
        }
    }
}

pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    /// Lifetimes above [`MAX_TOKEN_TTL_SECS`] are clamped to it.
    pub fn new(secret: &[u8], ttl_secs: u64) -> Self {
        let ttl_secs = i64::try_from(ttl_secs.min(MAX_TOKEN_TTL_SECS)).unwrap_or(0);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::try_seconds(ttl_secs).unwrap_or_else(Duration::zero),
        }
    }

    pub fn from_config(auth: &AuthConfig) -> Self {
        Self::new(auth.jwt_secret.expose_secret().as_bytes(), auth.token_ttl_secs)
    }

    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        self.issue_at(user, Utc::now())
    }

    pub fn issue_at(&self, user: &User, issued_at: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user.id.0.to_string(),
            username: user.username.clone(),
            role: user.role,
            iat: issued_at.timestamp(),
            exp: issued_at
                .checked_add_signed(self.ttl)
                .ok_or_else(|| AuthError::Signing("token expiry is out of range".to_string()))?
                .timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|error| AuthError::Signing(error.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Actor, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default()).map_err(
            |error| match error.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid(error.to_string()),
            },
        )?;

        let claims = data.claims;
        let id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AuthError::Invalid(format!("subject `{}` is not a user id", claims.sub)))?;
        Ok(Actor::new(UserId(id), claims.username, claims.role))
    }

    /// Reads `Authorization: Bearer <token>`.
    pub fn verify_header(&self, header: Option<&str>) -> Result<Actor, AuthError> {
        let header = header.ok_or(AuthError::MissingToken)?;
        let token = header.strip_prefix("Bearer ").ok_or(AuthError::NotBearer)?.trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        self.verify(token)
    }
}

/// The verified caller of a request.
#[derive(Clone, Debug)]
pub struct AuthenticatedActor(pub Actor);

impl FromRequestParts<AppState> for AuthenticatedActor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let correlation_id = CorrelationId::from_parts(parts);
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        state
            .tokens
            .verify_header(header)
            .map(AuthenticatedActor)
            .map_err(|error| correlation_id.fail(error.into()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};
    use fleetgate_core::config::MAX_TOKEN_TTL_SECS;
    use fleetgate_core::domain::user::{Role, User, UserId};

    use super::{AuthError, TokenIssuer};

    fn approver() -> User {
        User {
            id: UserId(2),
            username: "approver1".to_string(),
            name: "Approver Satu".to_string(),
            role: Role::Approver,
        }
    }

    #[test]
    fn issued_token_verifies_back_to_the_same_actor() {
        let issuer = TokenIssuer::new(b"unit-test-secret-0123456789", 3_600);
        let token = issuer.issue(&approver()).expect("issue");

        let actor = issuer.verify_header(Some(&format!("Bearer {token}"))).expect("verify");
        assert_eq!(actor.id, UserId(2));
        assert_eq!(actor.username, "approver1");
        assert_eq!(actor.role, Role::Approver);
    }

    #[test]
    fn expired_and_foreign_tokens_are_refused() {
        let issuer = TokenIssuer::new(b"unit-test-secret-0123456789", 60);
        let stale =
            issuer.issue_at(&approver(), Utc::now() - Duration::hours(2)).expect("issue");
        assert_eq!(issuer.verify(&stale), Err(AuthError::Expired));

        let other = TokenIssuer::new(b"another-secret-abcdefghijkl", 60);
        let foreign = other.issue(&approver()).expect("issue");
        assert!(matches!(issuer.verify(&foreign), Err(AuthError::Invalid(_))));
    }

    #[test]
    fn oversized_lifetimes_are_clamped_instead_of_overflowing() {
        let issuer = TokenIssuer::new(b"unit-test-secret-0123456789", 10_000_000_000_000);
        let token = issuer.issue(&approver()).expect("issue");
        assert!(issuer.verify(&token).is_ok());

        let issued_at = Utc::now();
        let huge = TokenIssuer::new(b"unit-test-secret-0123456789", u64::MAX);
        let token = huge.issue_at(&approver(), issued_at).expect("issue");
        let claims = jsonwebtoken::decode::<super::Claims>(
            &token,
            &jsonwebtoken::DecodingKey::from_secret(b"unit-test-secret-0123456789"),
            &jsonwebtoken::Validation::default(),
        )
        .expect("decode")
        .claims;
        let max = i64::try_from(MAX_TOKEN_TTL_SECS).expect("fits");
        assert_eq!(claims.exp - claims.iat, max);
    }

    #[test]
    fn expiry_past_the_calendar_limit_is_a_signing_error() {
        let issuer = TokenIssuer::new(b"unit-test-secret-0123456789", 3_600);
        let result = issuer.issue_at(&approver(), DateTime::<Utc>::MAX_UTC);
        assert!(matches!(result, Err(AuthError::Signing(_))));
    }

    #[test]
    fn header_must_be_a_bearer_token() {
        let issuer = TokenIssuer::new(b"unit-test-secret-0123456789", 60);
        assert_eq!(issuer.verify_header(None), Err(AuthError::MissingToken));
        assert_eq!(issuer.verify_header(Some("Basic abc")), Err(AuthError::NotBearer));
        assert_eq!(issuer.verify_header(Some("Bearer ")), Err(AuthError::MissingToken));
    }
}
