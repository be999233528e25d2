//! Permission gate for resource routes.
//!
//! Each resource handler is wrapped individually with `require_permission`,
//! configured with the permission that handler needs. The middleware:
//!
//! 1. Extracts the bearer token from the Authorization header
//! 2. Verifies it against the identity provider's JWKS
//! 3. Checks the `permissions` claim for the required permission
//! 4. Inserts the verified `Claims` into request extensions

use crate::auth::{Claims, JwtValidator};
use crate::errors::CastingError;
use crate::observability::metrics::record_auth_failure;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// State for one gated handler: the shared validator plus the permission
/// that handler requires.
#[derive(Clone)]
pub struct PermissionGate {
    pub jwt_validator: Arc<JwtValidator>,
    pub permission: &'static str,
}

impl PermissionGate {
    pub fn new(jwt_validator: Arc<JwtValidator>, permission: &'static str) -> Self {
        Self {
            jwt_validator,
            permission,
        }
    }
}

/// Extract the bearer token from the Authorization header.
///
/// The header must split into exactly two whitespace-separated parts and the
/// first must be `Bearer` (any case).
fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, CastingError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!(target: "casting.middleware.auth", "Missing Authorization header");
            CastingError::unauthorized("authorization header is expected")
        })?;

    let mut parts = auth_header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        (Some(scheme), _, _) if !scheme.eq_ignore_ascii_case("bearer") => {
            tracing::debug!(target: "casting.middleware.auth", "Authorization header must start with Bearer");
            Err(CastingError::unauthorized(
                "authorization header must start with Bearer",
            ))
        }
        _ => {
            tracing::debug!(target: "casting.middleware.auth", "Authorization header must be a bearer token");
            Err(CastingError::unauthorized(
                "authorization header must be bearer token",
            ))
        }
    }
}

/// Check that verified claims grant `permission`.
///
/// # Errors
///
/// - `Auth` with internal code 400 if the `permissions` claim is absent
/// - `Auth` with internal code 401 if the permission is not granted
pub fn check_permissions(permission: &str, claims: &Claims) -> Result<(), CastingError> {
    if claims.permissions.is_none() {
        return Err(CastingError::invalid_claims(
            "permissions not included in token",
        ));
    }

    if !claims.has_permission(permission) {
        return Err(CastingError::unauthorized(format!(
            "permission {permission} not found"
        )));
    }

    Ok(())
}

/// Verify the bearer token and require the gate's permission.
///
/// # Response
///
/// - 401 with the auth envelope if the token is missing, invalid, or lacks
///   the permission
/// - 500 if the JWKS cannot be fetched
/// - Otherwise continues with `Claims` in request extensions
#[instrument(skip_all, name = "casting.middleware.auth")]
pub async fn require_permission(
    State(gate): State<Arc<PermissionGate>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, CastingError> {
    let token = extract_bearer_token(req.headers()).inspect_err(|_| {
        record_auth_failure("invalid_header");
    })?;

    let claims = gate
        .jwt_validator
        .validate(token)
        .await
        .inspect_err(|e| {
            record_auth_failure(match e {
                CastingError::ServiceUnavailable(_) => "jwks_unavailable",
                _ => "invalid_token",
            });
        })?;

    check_permissions(gate.permission, &claims).inspect_err(|e| {
        record_auth_failure(match e {
            CastingError::Auth { status: 400, .. } => "invalid_claims",
            _ => "missing_permission",
        });
    })?;

    tracing::debug!(target: "casting.middleware.auth", permission = gate.permission, "Permission granted");

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn claims(permissions: Option<&[&str]>) -> Claims {
        Claims {
            iss: "https://casting.eu.auth0.com/".to_string(),
            sub: "auth0|director".to_string(),
            exp: 1_900_000_000,
            iat: 1_899_990_000,
            permissions: permissions.map(|p| p.iter().map(|s| s.to_string()).collect()),
        }
    }

    #[test]
    fn test_extract_bearer_token_valid() {
        let headers = headers_with("Bearer abc.def.ghi");
        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_extract_bearer_token_scheme_is_case_insensitive() {
        let headers = headers_with("bearer abc.def.ghi");
        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_extract_bearer_token_missing_header() {
        let err = extract_bearer_token(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, CastingError::Auth { status: 401, .. }));
    }

    #[test]
    fn test_extract_bearer_token_rejects_other_schemes() {
        for value in ["Basic dXNlcjpwYXNz", "Token abc.def.ghi"] {
            let err = extract_bearer_token(&headers_with(value)).unwrap_err();
            assert!(matches!(err, CastingError::Auth { status: 401, .. }));
        }
    }

    #[test]
    fn test_extract_bearer_token_rejects_wrong_part_count() {
        for value in ["Bearer", "Bearer a.b.c extra", "abc.def.ghi"] {
            let err = extract_bearer_token(&headers_with(value)).unwrap_err();
            assert!(
                matches!(err, CastingError::Auth { status: 401, .. }),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn test_check_permissions_granted() {
        let claims = claims(Some(&["get:actors", "get:movies"]));
        assert!(check_permissions("get:actors", &claims).is_ok());
    }

    #[test]
    fn test_check_permissions_missing_claim_is_invalid_claims() {
        let err = check_permissions("get:actors", &claims(None)).unwrap_err();
        assert!(matches!(err, CastingError::Auth { status: 400, .. }));
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn test_check_permissions_not_granted() {
        let claims = claims(Some(&["get:actors"]));
        let err = check_permissions("delete:actors", &claims).unwrap_err();
        assert!(matches!(err, CastingError::Auth { status: 401, .. }));
    }

    #[test]
    fn test_check_permissions_empty_grant() {
        let err = check_permissions("get:movies", &claims(Some(&[]))).unwrap_err();
        assert!(matches!(err, CastingError::Auth { status: 401, .. }));
    }

    #[test]
    fn test_permission_gate_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<PermissionGate>();
    }
}
