use std::fmt;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::principal::{Identity, Role};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "vetsense_session";

pub type SessionToken = String;

/// Secret and lifetime used to sign and verify session tokens.
#[derive(Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub ttl: Duration,
}

impl SessionConfig {
    pub fn new(secret: impl Into<String>, ttl: Duration) -> Self {
        Self { secret: secret.into(), ttl }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Claims embedded in a session token at login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub sub: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub iat: u64,
    pub exp: u64,
}

/// Every way a token can fail verification. Never surfaced past `inspect`.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("session token missing")]
    Missing,
    #[error("session token rejected: {0}")]
    Rejected(#[from] jsonwebtoken::errors::Error),
    #[error("session token has an empty subject")]
    EmptySubject,
}

/// Issues and verifies signed session tokens with a secret injected at construction.
#[derive(Clone)]
pub struct SessionManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

fn now_secs() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}

impl SessionManager {
    pub fn new(cfg: &SessionConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            validation,
            ttl: cfg.ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for `identity`, valid for the configured ttl.
    pub fn issue(&self, identity: &Identity, name: Option<&str>) -> Result<SessionToken, TokenError> {
        let iat = now_secs();
        let claims = SessionClaims {
            sub: identity.subject_id.clone(),
            role: identity.role,
            name: name.map(str::to_string),
            iat,
            exp: iat + self.ttl.as_secs(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(target: "vetsense::session", "issued token sub={} role={} ttl_secs={}", claims.sub, claims.role, self.ttl.as_secs());
        Ok(token)
    }

    /// Verify signature, algorithm and expiry and return the embedded identity.
    pub fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TokenError::Missing);
        }
        let data = decode::<SessionClaims>(token, &self.decoding, &self.validation)?;
        if data.claims.sub.trim().is_empty() {
            return Err(TokenError::EmptySubject);
        }
        Ok(Identity { subject_id: data.claims.sub, role: data.claims.role })
    }

    /// Fail-closed inspection: any verification failure is an anonymous request.
    pub fn inspect(&self, token: Option<&str>) -> Option<Identity> {
        let Some(token) = token else { return None; };
        match self.verify(token) {
            Ok(identity) => Some(identity),
            Err(e) => {
                debug!(target: "vetsense::session", "treating request as anonymous: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(secret: &str) -> SessionManager {
        SessionManager::new(&SessionConfig::new(secret, Duration::from_secs(3600)))
    }

    #[test]
    fn issued_token_verifies_with_same_secret() {
        let sm = manager("unit-test-secret-0123456789");
        let id = Identity::new("user-7", Role::Owner);
        let token = sm.issue(&id, Some("Jo")).unwrap();
        assert_eq!(sm.inspect(Some(&token)), Some(id));
    }

    #[test]
    fn missing_token_is_anonymous() {
        let sm = manager("unit-test-secret-0123456789");
        assert_eq!(sm.inspect(None), None);
        assert!(matches!(sm.verify("   "), Err(TokenError::Missing)));
    }

    #[test]
    fn debug_never_prints_secret() {
        let cfg = SessionConfig::new("super-secret-value", Duration::from_secs(1));
        let out = format!("{cfg:?}");
        assert!(!out.contains("super-secret-value"));
        assert!(out.contains("<redacted>"));
    }
}
