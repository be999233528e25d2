//! Builder patterns for test tokens
//!
//! Provides a fluent API for minting signed bearer tokens and the three
//! casting agency roles as permission presets.

use crate::crypto_fixtures::TestSigningKey;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Header};
use serde_json::{json, Map, Value};

/// Casting agency roles and the permissions each is granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Read-only access to actors and movies.
    CastingAssistant,
    /// Assistant plus actor management and movie edits.
    CastingDirector,
    /// Every permission.
    ExecutiveProducer,
}

impl Role {
    /// Permission strings carried in this role's tokens.
    pub fn permissions(self) -> Vec<String> {
        let granted: &[&str] = match self {
            Role::CastingAssistant => &["get:actors", "get:movies"],
            Role::CastingDirector => &[
                "get:actors",
                "get:movies",
                "create:actors",
                "delete:actors",
                "update:actors",
                "update:movies",
            ],
            Role::ExecutiveProducer => &[
                "get:actors",
                "get:movies",
                "create:actors",
                "delete:actors",
                "update:actors",
                "update:movies",
                "create:movies",
                "delete:movies",
            ],
        };
        granted.iter().map(|p| p.to_string()).collect()
    }
}

/// Builder for signed test JWTs
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new(issuer, audience)
///     .with_role(Role::CastingDirector)
///     .expires_in(3600)
///     .sign(&key);
/// ```
#[derive(Debug, Clone)]
pub struct TestTokenBuilder {
    iss: String,
    aud: Value,
    sub: String,
    exp: i64,
    iat: i64,
    permissions: Option<Vec<String>>,
    kid: Option<String>,
}

impl TestTokenBuilder {
    /// Create a builder for the given issuer and audience, valid for an hour
    /// and carrying an empty permission list.
    pub fn new(issuer: &str, audience: &str) -> Self {
        let now = Utc::now();
        Self {
            iss: issuer.to_string(),
            aud: Value::String(audience.to_string()),
            sub: "auth0|casting-test-user".to_string(),
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: now.timestamp(),
            permissions: Some(Vec::new()),
            kid: None,
        }
    }

    /// Set the subject
    pub fn for_user(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    /// Override the issuer
    pub fn issuer(mut self, issuer: &str) -> Self {
        self.iss = issuer.to_string();
        self
    }

    /// Override the audience with a single value
    pub fn audience(mut self, audience: &str) -> Self {
        self.aud = Value::String(audience.to_string());
        self
    }

    /// Set the audience to an array of values
    pub fn audiences(mut self, audiences: &[&str]) -> Self {
        self.aud = json!(audiences);
        self
    }

    /// Grant the permissions of a role
    pub fn with_role(mut self, role: Role) -> Self {
        self.permissions = Some(role.permissions());
        self
    }

    /// Add a single permission
    pub fn with_permission(mut self, permission: &str) -> Self {
        self.permissions
            .get_or_insert_with(Vec::new)
            .push(permission.to_string());
        self
    }

    /// Omit the permissions claim entirely
    pub fn without_permissions_claim(mut self) -> Self {
        self.permissions = None;
        self
    }

    /// Set expiration in seconds from now (negative for an expired token)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set issued-at timestamp
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    /// Put a different `kid` in the header than the signing key's own
    pub fn with_kid(mut self, kid: &str) -> Self {
        self.kid = Some(kid.to_string());
        self
    }

    /// Build the claims as a JSON value
    pub fn claims(&self) -> Value {
        let mut claims = Map::new();
        claims.insert("iss".to_string(), json!(self.iss));
        claims.insert("sub".to_string(), json!(self.sub));
        claims.insert("aud".to_string(), self.aud.clone());
        claims.insert("exp".to_string(), json!(self.exp));
        claims.insert("iat".to_string(), json!(self.iat));
        if let Some(permissions) = &self.permissions {
            claims.insert("permissions".to_string(), json!(permissions));
        }
        Value::Object(claims)
    }

    /// Sign the claims with `key`
    pub fn sign(&self, key: &TestSigningKey) -> String {
        let mut header = Header::new(key.algorithm());
        header.kid = Some(self.kid.clone().unwrap_or_else(|| key.kid.clone()));

        encode(&header, &self.claims(), key.encoding_key()).expect("failed to sign test token")
    }
}
