//! HS256 token issuing/verification on top of the transport-agnostic claims.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use uuid::Uuid;

use crate::claims::{Claims, PrincipalKind, validate_claims};
use crate::Permission;

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("invalid token")]
    Invalid,

    #[error("{0}")]
    Claims(#[from] crate::claims::TokenValidationError),
}

/// Verification seam used by the API middleware (mockable in tests).
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, JwtError>;
}

/// HS256 signer/verifier over a shared secret.
pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl Hs256Jwt {
    pub const DEFAULT_TTL_MINUTES: i64 = 60 * 24;

    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::minutes(Self::DEFAULT_TTL_MINUTES),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Issue a token for an authenticated principal.
    pub fn issue(
        &self,
        sub: Uuid,
        kind: PrincipalKind,
        permissions: Vec<Permission>,
        now: DateTime<Utc>,
    ) -> Result<String, JwtError> {
        let claims = Claims {
            sub,
            kind,
            permissions,
            issued_at: now,
            expires_at: now + self.ttl,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|_| JwtError::Invalid)
    }
}

impl JwtValidator for Hs256Jwt {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, JwtError> {
        // Expiry is checked against our own claims below, not the `exp` field.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|_| JwtError::Invalid)?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_round_trips() {
        let jwt = Hs256Jwt::new(b"test-secret");
        let sub = Uuid::now_v7();
        let now = Utc::now();
        let token = jwt
            .issue(sub, PrincipalKind::Admin, vec![Permission::new("*")], now)
            .unwrap();

        let claims = jwt.validate(&token, now).unwrap();
        assert_eq!(claims.sub, sub);
        assert_eq!(claims.kind, PrincipalKind::Admin);
        assert!(claims.permissions[0].is_wildcard());
    }

    #[test]
    fn wrong_secret_rejected() {
        let jwt = Hs256Jwt::new(b"secret-a");
        let other = Hs256Jwt::new(b"secret-b");
        let now = Utc::now();
        let token = jwt
            .issue(Uuid::now_v7(), PrincipalKind::Customer, vec![], now)
            .unwrap();
        assert!(matches!(other.validate(&token, now), Err(JwtError::Invalid)));
    }

    #[test]
    fn expired_token_rejected() {
        let jwt = Hs256Jwt::new(b"test-secret").with_ttl(Duration::minutes(5));
        let now = Utc::now();
        let token = jwt
            .issue(Uuid::now_v7(), PrincipalKind::Customer, vec![], now)
            .unwrap();
        let later = now + Duration::minutes(10);
        assert!(matches!(jwt.validate(&token, later), Err(JwtError::Claims(_))));
    }
}
