//! JWT access and refresh tokens.
//!
//! Both token types are HS256 JWTs signed with the same secret and told
//! apart by the `token_type` claim. Every token carries a fresh `jti` so a
//! refresh token can be revoked on its own.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::http::response::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub token_type: TokenType,
    pub user_id: i64,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            access_ttl: Duration::seconds(config.access_token_ttl_secs),
            refresh_ttl: Duration::seconds(config.refresh_token_ttl_secs),
        }
    }

    /// Sign one token for `user_id`.
    pub fn issue(&self, user_id: i64, token_type: TokenType) -> Result<(String, Claims), ApiError> {
        let now = Utc::now();
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            token_type,
            user_id,
            jti: Uuid::new_v4().simple().to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("failed to sign token: {}", e)))?;
        Ok((token, claims))
    }

    pub fn issue_pair(&self, user_id: i64) -> Result<TokenPair, ApiError> {
        let (access, _) = self.issue(user_id, TokenType::Access)?;
        let (refresh, _) = self.issue(user_id, TokenType::Refresh)?;
        Ok(TokenPair { access, refresh })
    }

    /// Decode and check signature, expiry and type.
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, ApiError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "Token rejected");
            ApiError::InvalidToken
        })?;

        if data.claims.token_type != expected {
            tracing::debug!(
                expected = ?expected,
                actual = ?data.claims.token_type,
                "Token of wrong type"
            );
            return Err(ApiError::InvalidToken);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> TokenService {
        TokenService::new(&AuthConfig {
            jwt_secret: secret.to_string(),
            ..AuthConfig::default()
        })
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = service("secret");
        let (token, issued) = tokens.issue(42, TokenType::Access).unwrap();
        let claims = tokens.verify(&token, TokenType::Access).unwrap();

        assert_eq!(claims, issued);
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_pair_has_distinct_tokens() {
        let tokens = service("secret");
        let pair = tokens.issue_pair(7).unwrap();
        let access = tokens.verify(&pair.access, TokenType::Access).unwrap();
        let refresh = tokens.verify(&pair.refresh, TokenType::Refresh).unwrap();

        assert_ne!(access.jti, refresh.jti);
        assert_eq!(refresh.exp - refresh.iat, 7 * 24 * 3600);
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        let tokens = service("secret");
        let (refresh, _) = tokens.issue(1, TokenType::Refresh).unwrap();
        assert!(matches!(
            tokens.verify(&refresh, TokenType::Access),
            Err(ApiError::InvalidToken)
        ));
    }

    #[test]
    fn test_foreign_signature_is_rejected() {
        let (token, _) = service("one").issue(1, TokenType::Access).unwrap();
        assert!(service("two").verify(&token, TokenType::Access).is_err());
        assert!(service("one").verify("not.a.jwt", TokenType::Access).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let tokens = TokenService::new(&AuthConfig {
            jwt_secret: "secret".to_string(),
            access_token_ttl_secs: -120,
            ..AuthConfig::default()
        });
        let (token, _) = tokens.issue(1, TokenType::Access).unwrap();
        assert!(tokens.verify(&token, TokenType::Access).is_err());
    }
}
