//! Caller authentication.
//!
//! [`TokenValidator`] turns an `Authorization` header into a [`Principal`]:
//! it parses the bearer credential, asks the identity provider to verify the
//! token and then checks the returned claims against the accepted issuers,
//! audience and client.

use crate::config::IdentityConfig;
use crate::models::Principal;
use chrono::Utc;
use log::debug;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use thiserror::Error;

pub mod tokeninfo;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthenticationError {
    #[error("Malformed authorization header")]
    MalformedHeader,
    #[error("Token rejected: {0}")]
    TokenRejected(String),
}

/// Claims returned by the identity provider for a verified token
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Claims {
    pub iss: String,
    pub aud: String,
    #[serde(default)]
    pub azp: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    /// Expiry as seconds since the epoch
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub exp: i64,
}

/// Verifies a raw token's signature and returns its claims
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Claims, AuthenticationError>;
}

#[derive(Clone)]
pub struct TokenValidator {
    provider: Arc<dyn IdentityProvider>,
    issuers: Vec<String>,
    audience: String,
    client_id: Option<String>,
}

impl TokenValidator {
    pub fn new(provider: Arc<dyn IdentityProvider>, config: &IdentityConfig) -> Self {
        Self {
            provider,
            issuers: config.issuers.clone(),
            audience: config.audience.clone(),
            client_id: config.client_id.clone(),
        }
    }

    /// Authenticate an `Authorization` header value and return the caller
    pub async fn validate(&self, authorization: &str) -> Result<Principal, AuthenticationError> {
        let token = parse_bearer(authorization)?;
        let claims = self.provider.verify(token).await?;
        self.check_claims(claims)
    }

    fn check_claims(&self, claims: Claims) -> Result<Principal, AuthenticationError> {
        if !self.issuers.iter().any(|issuer| *issuer == claims.iss) {
            return Err(AuthenticationError::TokenRejected(format!(
                "unexpected issuer '{}'",
                claims.iss
            )));
        }
        if claims.aud != self.audience {
            return Err(AuthenticationError::TokenRejected(format!(
                "unexpected audience '{}'",
                claims.aud
            )));
        }
        if let Some(client_id) = &self.client_id {
            if claims.azp.as_deref() != Some(client_id.as_str()) {
                return Err(AuthenticationError::TokenRejected(
                    "token was issued to another client".to_string(),
                ));
            }
        }
        if claims.exp <= Utc::now().timestamp() {
            return Err(AuthenticationError::TokenRejected("token expired".to_string()));
        }

        match claims.sub {
            Some(sub) if !sub.is_empty() => {
                debug!("Authenticated principal {}", sub);
                Ok(Principal::new(sub))
            }
            _ => Err(AuthenticationError::TokenRejected(
                "token has no subject".to_string(),
            )),
        }
    }
}

/// Extract the token from a `Bearer <token>` header value
pub fn parse_bearer(authorization: &str) -> Result<&str, AuthenticationError> {
    let (scheme, token) = authorization
        .trim()
        .split_once(' ')
        .ok_or(AuthenticationError::MalformedHeader)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthenticationError::MalformedHeader);
    }

    let token = token.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AuthenticationError::MalformedHeader);
    }
    Ok(token)
}

// Token-info endpoints send `exp` as a numeric string, JWT claims use a number
fn deserialize_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Timestamp {
        Number(i64),
        Text(String),
    }

    match Timestamp::deserialize(deserializer)? {
        Timestamp::Number(value) => Ok(value),
        Timestamp::Text(value) => value.trim().parse().map_err(serde::de::Error::custom),
    }
}
