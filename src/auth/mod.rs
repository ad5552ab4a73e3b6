use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;

/// Claims issued by the identity provider for a signed-in user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Provider subject (stable external user id)
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

impl Claims {
    pub fn new(sub: impl Into<String>, email: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: sub.into(),
            email: Some(email.into()),
            given_name: None,
            family_name: None,
            picture: None,
            iss: None,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingHeader,
    #[error("Authorization header must use Bearer token format")]
    InvalidHeader,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Token carries no email claim")]
    MissingEmail,
    #[error("No token signing key configured")]
    NotConfigured,
    #[error("Token generation error: {0}")]
    TokenGeneration(String),
}

/// Verifies identity-provider tokens against the configured key
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("algorithms", &self.validation.algorithms)
            .finish()
    }
}

impl TokenVerifier {
    /// RS256 public key wins over an HS256 shared secret when both are configured
    pub fn from_config(config: &SecurityConfig) -> Result<Self, AuthError> {
        let (key, algorithm) = if let Some(pem) = &config.jwt_public_key {
            let key = DecodingKey::from_rsa_pem(pem.as_bytes())
                .map_err(|e| AuthError::InvalidToken(format!("unusable public key: {}", e)))?;
            (key, Algorithm::RS256)
        } else if let Some(secret) = &config.jwt_secret {
            (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256)
        } else {
            return Err(AuthError::NotConfigured);
        };

        let mut validation = Validation::new(algorithm);
        validation.leeway = config.jwt_leeway_secs;
        if let Some(issuer) = &config.jwt_issuer {
            validation.set_issuer(&[issuer]);
        }
        match &config.jwt_audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Ok(Self { key, validation })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        Ok(data.claims)
    }
}

/// Sign claims with the HS256 shared secret (development tokens and tests)
pub fn generate_jwt(config: &SecurityConfig, claims: &Claims) -> Result<String, AuthError> {
    let secret = config.jwt_secret.as_deref().ok_or(AuthError::NotConfigured)?;

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::new(Algorithm::HS256);

    encode(&header, claims, &encoding_key).map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn security(secret: &str) -> SecurityConfig {
        let mut config = AppConfig::development().security;
        config.jwt_secret = Some(secret.to_string());
        config
    }

    #[test]
    fn verifies_tokens_signed_with_the_shared_secret() {
        let config = security("test-secret");
        let token = generate_jwt(&config, &Claims::new("user_1", "mor@example.com", Duration::hours(1))).unwrap();

        let claims = TokenVerifier::from_config(&config).unwrap().verify(&token).unwrap();
        assert_eq!(claims.sub, "user_1");
        assert_eq!(claims.email.as_deref(), Some("mor@example.com"));
    }

    #[test]
    fn rejects_tokens_signed_with_another_secret() {
        let token = generate_jwt(&security("other"), &Claims::new("user_1", "a@b.dk", Duration::hours(1))).unwrap();

        let err = TokenVerifier::from_config(&security("test-secret"))
            .unwrap()
            .verify(&token)
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn rejects_expired_tokens() {
        let config = security("test-secret");
        let token = generate_jwt(&config, &Claims::new("user_1", "a@b.dk", Duration::hours(-2))).unwrap();

        assert!(TokenVerifier::from_config(&config).unwrap().verify(&token).is_err());
    }

    #[test]
    fn enforces_configured_issuer() {
        let mut config = security("test-secret");
        config.jwt_issuer = Some("https://clerk.reschool.dk".to_string());

        let mut claims = Claims::new("user_1", "a@b.dk", Duration::hours(1));
        claims.iss = Some("https://elsewhere.example".to_string());
        let token = generate_jwt(&config, &claims).unwrap();
        assert!(TokenVerifier::from_config(&config).unwrap().verify(&token).is_err());

        claims.iss = Some("https://clerk.reschool.dk".to_string());
        let token = generate_jwt(&config, &claims).unwrap();
        assert!(TokenVerifier::from_config(&config).unwrap().verify(&token).is_ok());
    }

    #[test]
    fn requires_a_key() {
        let config = AppConfig::development().security;
        assert!(matches!(TokenVerifier::from_config(&config), Err(AuthError::NotConfigured)));
    }
}
