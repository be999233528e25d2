//! JWT claims structure.
//!
//! Contains the claims extracted from validated identity provider tokens.
//! The `sub` field is redacted in Debug output to prevent exposure in logs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Claims carried by a verified access token.
///
/// `aud` is checked during signature verification and is not kept here.
#[derive(Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer URL of the identity provider.
    pub iss: String,

    /// Subject (user or client id) - redacted in Debug output.
    pub sub: String,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: i64,

    /// Permissions granted through the identity provider's RBAC settings.
    ///
    /// `None` when the claim is absent, which the permission gate treats
    /// as a malformed token rather than an empty grant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

/// Custom Debug implementation that redacts the `sub` field.
impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("iss", &self.iss)
            .field("sub", &"[REDACTED]")
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("permissions", &self.permissions)
            .finish()
    }
}

impl Claims {
    /// Check whether the token grants `permission`.
    ///
    /// Returns false when the `permissions` claim is absent.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .as_deref()
            .is_some_and(|granted| granted.iter().any(|p| p == permission))
    }
}
