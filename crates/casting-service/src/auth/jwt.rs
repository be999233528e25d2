//! JWT validation for the casting service.
//!
//! Validates access tokens using public keys fetched from the identity
//! provider's JWKS endpoint.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - The algorithm is pinned by the JWK's key type, never by the token header
//! - `exp`, `iss` and `aud` are required; `iat` is checked with clock skew
//! - Every failure produces the same client-facing error

use crate::auth::claims::Claims;
use crate::auth::jwks::{Jwk, JwksClient};
use crate::errors::CastingError;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use std::sync::Arc;
use tracing::instrument;

/// Largest bearer token accepted. Checked before the token is parsed.
pub const MAX_TOKEN_BYTES: usize = 8192;

/// JWT validator backed by the identity provider's JWKS.
pub struct JwtValidator {
    jwks_client: Arc<JwksClient>,

    /// Expected `iss` claim.
    issuer: String,

    /// Expected `aud` claim (matched against string or array form).
    audience: String,

    /// How far `iat` may sit ahead of the server clock, in seconds.
    clock_skew_seconds: i64,
}

impl JwtValidator {
    /// Create a new JWT validator.
    ///
    /// # Arguments
    ///
    /// * `jwks_client` - Client for fetching public keys
    /// * `issuer` - Expected issuer, e.g. `https://tenant.auth0.com/`
    /// * `audience` - Expected API audience
    /// * `clock_skew_seconds` - Clock skew tolerance for iat validation
    pub fn new(
        jwks_client: Arc<JwksClient>,
        issuer: String,
        audience: String,
        clock_skew_seconds: i64,
    ) -> Self {
        Self {
            jwks_client,
            issuer,
            audience,
            clock_skew_seconds: clock_skew_seconds.abs(),
        }
    }

    /// Validate a bearer token and return its claims.
    ///
    /// # Security Checks
    ///
    /// 1. Size check and `kid` extraction (before any crypto)
    /// 2. Key lookup in the JWKS
    /// 3. Signature verification with the key's algorithm
    /// 4. `exp`, `iss`, `aud` validation
    /// 5. `iat` validation with clock skew tolerance
    ///
    /// # Errors
    ///
    /// Returns `CastingError::Auth` (401) for every token problem and
    /// `CastingError::ServiceUnavailable` when the JWKS cannot be fetched.
    #[instrument(skip_all, name = "casting.auth.validate")]
    pub async fn validate(&self, token: &str) -> Result<Claims, CastingError> {
        let kid = signing_kid(token)?;

        let jwk = self.jwks_client.get_key(&kid).await?;

        let claims = verify_token(token, &jwk, &self.issuer, &self.audience)?;

        check_issued_at(claims.iat, chrono::Utc::now().timestamp(), self.clock_skew_seconds)?;

        tracing::debug!(target: "casting.auth.jwt", "Token validated successfully");
        Ok(claims)
    }
}

/// Size-check the token and read the `kid` from its header.
fn signing_kid(token: &str) -> Result<String, CastingError> {
    if token.len() > MAX_TOKEN_BYTES {
        tracing::debug!(
            target: "casting.auth.jwt",
            token_size = token.len(),
            max_size = MAX_TOKEN_BYTES,
            "Token rejected: size exceeds maximum"
        );
        return Err(CastingError::unauthorized("token too large"));
    }

    let header = decode_header(token).map_err(|e| {
        tracing::debug!(target: "casting.auth.jwt", error = %e, "Token header could not be decoded");
        CastingError::unauthorized("malformed token header")
    })?;

    match header.kid {
        Some(kid) if !kid.is_empty() => Ok(kid),
        _ => {
            tracing::debug!(target: "casting.auth.jwt", "Token header has no kid");
            Err(CastingError::unauthorized("malformed token header"))
        }
    }
}

/// Reject tokens whose `iat` is more than `skew_seconds` ahead of `now`.
fn check_issued_at(iat: i64, now: i64, skew_seconds: i64) -> Result<(), CastingError> {
    if iat > now.saturating_add(skew_seconds) {
        tracing::debug!(
            target: "casting.auth.jwt",
            iat = iat,
            now = now,
            skew_seconds = skew_seconds,
            "Token iat is too far in the future"
        );
        return Err(CastingError::unauthorized("token issued in the future"));
    }
    Ok(())
}

/// Build the decoding key and algorithm for a JWK.
///
/// RSA keys verify RS256 and OKP/Ed25519 keys verify EdDSA. A JWK whose
/// declared `alg` contradicts its key type is rejected.
fn decoding_key_for(jwk: &Jwk) -> Result<(DecodingKey, Algorithm), CastingError> {
    let (algorithm, expected_alg) = match jwk.kty.as_str() {
        "RSA" => (Algorithm::RS256, "RS256"),
        "OKP" => (Algorithm::EdDSA, "EdDSA"),
        other => {
            tracing::warn!(target: "casting.auth.jwt", kty = %other, "Unsupported JWK key type");
            return Err(CastingError::unauthorized("unsupported key type"));
        }
    };

    if let Some(alg) = jwk.alg.as_deref() {
        if alg != expected_alg {
            tracing::warn!(target: "casting.auth.jwt", kty = %jwk.kty, alg = %alg, "JWK algorithm does not match key type");
            return Err(CastingError::unauthorized("key algorithm mismatch"));
        }
    }

    let key = match algorithm {
        Algorithm::EdDSA => {
            if jwk.crv.as_deref().is_some_and(|crv| crv != "Ed25519") {
                tracing::warn!(target: "casting.auth.jwt", kid = %jwk.kid, "Unsupported OKP curve");
                return Err(CastingError::unauthorized("unsupported curve"));
            }
            let x = jwk.x.as_deref().ok_or_else(|| {
                tracing::error!(target: "casting.auth.jwt", kid = %jwk.kid, "JWK missing x field");
                CastingError::unauthorized("incomplete signing key")
            })?;
            DecodingKey::from_ed_components(x).map_err(|e| {
                tracing::error!(target: "casting.auth.jwt", kid = %jwk.kid, error = %e, "Invalid Ed25519 public key");
                CastingError::unauthorized("invalid signing key")
            })?
        }
        _ => {
            let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
                tracing::error!(target: "casting.auth.jwt", kid = %jwk.kid, "JWK missing n or e field");
                return Err(CastingError::unauthorized("incomplete signing key"));
            };
            DecodingKey::from_rsa_components(n, e).map_err(|e| {
                tracing::error!(target: "casting.auth.jwt", error = %e, "Invalid RSA key components");
                CastingError::unauthorized("invalid signing key")
            })?
        }
    };

    Ok((key, algorithm))
}

/// Verify the token signature and standard claims, then extract `Claims`.
fn verify_token(
    token: &str,
    jwk: &Jwk,
    issuer: &str,
    audience: &str,
) -> Result<Claims, CastingError> {
    let (decoding_key, algorithm) = decoding_key_for(jwk)?;

    let mut validation = Validation::new(algorithm);
    validation.validate_exp = true;
    validation.set_issuer(&[issuer]);
    validation.set_audience(&[audience]);
    validation.set_required_spec_claims(&["exp", "iss", "aud"]);

    let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
        tracing::debug!(target: "casting.auth.jwt", error = %e, "Token verification failed");
        CastingError::unauthorized("token verification failed")
    })?;

    Ok(token_data.claims)
}
