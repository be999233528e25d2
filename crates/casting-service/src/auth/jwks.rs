//! JWKS client for fetching and caching the identity provider's signing keys.
//!
//! Keys are fetched from the provider's `/.well-known/jwks.json` document
//! and cached with a configurable TTL. A token whose `kid` is not in a
//! fresh cache may trigger a refresh so that rotated keys are picked up
//! without waiting for the TTL, but at most once per minimum refresh
//! interval. Refreshes are single-flight.
//!
//! # Security
//!
//! - Unknown `kid` values cannot force more than one fetch per interval
//! - With no usable cache, fetch failures surface as internal errors
//! - With a fresh cache, an unknown `kid` is always an auth failure
//! - HTTPS should be used in production (the default JWKS URL is HTTPS)

use crate::errors::CastingError;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// Default cache TTL in seconds (5 minutes).
const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;

/// Minimum time between refreshes triggered by unknown key IDs.
const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Timeout for a single JWKS fetch.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON Web Key from the JWKS document.
///
/// RSA keys carry `n`/`e`; Ed25519 (OKP) keys carry `crv`/`x`.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA" or "OKP").
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    pub kid: String,

    /// Algorithm the key is meant for ("RS256" or "EdDSA").
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use (should be "sig" for signing).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// Curve name for OKP keys.
    #[serde(default)]
    pub crv: Option<String>,

    /// OKP public key value (base64url).
    #[serde(default)]
    pub x: Option<String>,
}

/// JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    pub keys: Vec<Jwk>,
}

struct CachedJwks {
    keys: HashMap<String, Jwk>,
    expires_at: Instant,
}

enum CacheLookup {
    Hit(Jwk),
    UnknownKid,
    Stale,
}

/// Thread-safe client that fetches the JWKS and caches it.
pub struct JwksClient {
    jwks_url: String,
    http_client: reqwest::Client,
    cache: Arc<RwLock<Option<CachedJwks>>>,
    cache_ttl: Duration,
    min_refresh_interval: Duration,
    /// Held for the duration of a fetch; stores when the last fetch started.
    last_refresh: Mutex<Option<Instant>>,
}

impl JwksClient {
    /// Create a new JWKS client with the default 5 minute TTL.
    pub fn new(jwks_url: String) -> Self {
        Self::with_ttl(jwks_url, Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS))
    }

    /// Create a new JWKS client with a custom cache TTL.
    pub fn with_ttl(jwks_url: String, cache_ttl: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "casting.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            cache: Arc::new(RwLock::new(None)),
            cache_ttl,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
            last_refresh: Mutex::new(None),
        }
    }

    /// Override the minimum interval between unknown-`kid` refreshes.
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Get a JWK by key ID.
    ///
    /// Serves from the cache while it is fresh. An empty or expired cache is
    /// refreshed. An unknown `kid` against a fresh cache refreshes only if
    /// the last fetch started at least `min_refresh_interval` ago; otherwise,
    /// or if that refresh fails, the token is rejected from the cached set.
    ///
    /// # Errors
    ///
    /// Returns `CastingError::ServiceUnavailable` if there is no usable cache
    /// and the JWKS cannot be fetched.
    /// Returns `CastingError::Auth` (401) if the key ID is unknown.
    #[instrument(skip(self), fields(kid = %kid))]
    pub async fn get_key(&self, kid: &str) -> Result<Jwk, CastingError> {
        if let CacheLookup::Hit(key) = self.lookup(kid).await {
            tracing::debug!(target: "casting.auth.jwks", kid = %kid, "JWKS cache hit");
            return Ok(key);
        }

        // Concurrent misses queue here and re-check the cache once the
        // in-flight fetch completes.
        let mut last_refresh = self.last_refresh.lock().await;

        match self.lookup(kid).await {
            CacheLookup::Hit(key) => return Ok(key),
            CacheLookup::Stale => {
                *last_refresh = Some(Instant::now());
                self.refresh_cache().await?;
            }
            CacheLookup::UnknownKid => {
                if last_refresh.is_some_and(|at| at.elapsed() < self.min_refresh_interval) {
                    tracing::debug!(target: "casting.auth.jwks", kid = %kid, "Unknown key, JWKS refresh throttled");
                    return Err(CastingError::unauthorized("unknown signing key"));
                }

                tracing::debug!(target: "casting.auth.jwks", kid = %kid, "Key not in JWKS cache, refreshing");
                *last_refresh = Some(Instant::now());
                if let Err(e) = self.refresh_cache().await {
                    tracing::warn!(
                        target: "casting.auth.jwks",
                        kid = %kid,
                        error = %e,
                        "JWKS refresh failed, rejecting against cached keys"
                    );
                    return Err(CastingError::unauthorized("unknown signing key"));
                }
            }
        }
        drop(last_refresh);

        let cache = self.cache.read().await;
        if let Some(key) = cache.as_ref().and_then(|cached| cached.keys.get(kid)) {
            return Ok(key.clone());
        }

        tracing::warn!(target: "casting.auth.jwks", kid = %kid, "Key not found in JWKS after refresh");
        Err(CastingError::unauthorized("unknown signing key"))
    }

    async fn lookup(&self, kid: &str) -> CacheLookup {
        let cache = self.cache.read().await;
        match cache.as_ref() {
            Some(cached) if cached.expires_at > Instant::now() => match cached.keys.get(kid) {
                Some(key) => CacheLookup::Hit(key.clone()),
                None => CacheLookup::UnknownKid,
            },
            _ => CacheLookup::Stale,
        }
    }

    #[instrument(skip(self))]
    async fn refresh_cache(&self) -> Result<(), CastingError> {
        tracing::debug!(target: "casting.auth.jwks", url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "casting.auth.jwks", error = %e, "Failed to fetch JWKS");
                CastingError::ServiceUnavailable("identity provider unreachable".to_string())
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "casting.auth.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(CastingError::ServiceUnavailable(
                "identity provider returned an error".to_string(),
            ));
        }

        let jwks: JwksResponse = response.json().await.map_err(|e| {
            tracing::error!(target: "casting.auth.jwks", error = %e, "Failed to parse JWKS response");
            CastingError::ServiceUnavailable("identity provider sent an invalid JWKS".to_string())
        })?;

        let keys: HashMap<String, Jwk> = jwks
            .keys
            .into_iter()
            .map(|key| (key.kid.clone(), key))
            .collect();

        tracing::info!(
            target: "casting.auth.jwks",
            key_count = keys.len(),
            "JWKS cache refreshed"
        );

        let mut cache = self.cache.write().await;
        *cache = Some(CachedJwks {
            keys,
            expires_at: Instant::now() + self.cache_ttl,
        });

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn jwks_body() -> serde_json::Value {
        serde_json::json!({
            "keys": [
                {
                    "kty": "RSA",
                    "kid": "rsa-key-01",
                    "alg": "RS256",
                    "use": "sig",
                    "n": "m5c_wTx0",
                    "e": "AQAB"
                },
                {
                    "kty": "OKP",
                    "kid": "ed-key-01",
                    "crv": "Ed25519",
                    "x": "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo",
                    "alg": "EdDSA"
                }
            ]
        })
    }

    #[test]
    fn test_jwk_deserialization_rsa() {
        let jwks: JwksResponse = serde_json::from_value(jwks_body()).unwrap();
        let rsa = jwks.keys.first().unwrap();

        assert_eq!(rsa.kty, "RSA");
        assert_eq!(rsa.alg.as_deref(), Some("RS256"));
        assert_eq!(rsa.key_use.as_deref(), Some("sig"));
        assert_eq!(rsa.e.as_deref(), Some("AQAB"));
        assert!(rsa.x.is_none());
    }

    #[test]
    fn test_jwk_deserialization_minimal() {
        let jwk: Jwk = serde_json::from_str(r#"{"kty":"OKP","kid":"k"}"#).unwrap();

        assert!(jwk.alg.is_none());
        assert!(jwk.n.is_none());
        assert!(jwk.crv.is_none());
    }

    #[test]
    fn test_jwks_client_custom_ttl() {
        let client = JwksClient::with_ttl(
            "http://localhost:4000/.well-known/jwks.json".to_string(),
            Duration::from_secs(60),
        );
        assert_eq!(client.cache_ttl, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_get_key_caches_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = JwksClient::new(format!("{}/.well-known/jwks.json", server.uri()));

        let first = client.get_key("rsa-key-01").await.unwrap();
        let second = client.get_key("ed-key-01").await.unwrap();

        assert_eq!(first.kty, "RSA");
        assert_eq!(second.kty, "OKP");
        // MockServer verifies the single fetch on drop
    }

    #[tokio::test]
    async fn test_get_key_unknown_kid_within_interval_skips_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = JwksClient::new(format!("{}/.well-known/jwks.json", server.uri()));

        client.get_key("rsa-key-01").await.unwrap();
        for i in 0..20 {
            let err = client.get_key(&format!("bogus-{i}")).await.unwrap_err();
            assert!(matches!(err, CastingError::Auth { status: 401, .. }));
        }
    }

    #[tokio::test]
    async fn test_get_key_unknown_kid_refreshes_after_interval() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body()))
            .expect(2)
            .mount(&server)
            .await;

        let client = JwksClient::new(format!("{}/.well-known/jwks.json", server.uri()))
            .with_min_refresh_interval(Duration::from_millis(10));

        client.get_key("rsa-key-01").await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        let err = client.get_key("rotated-away").await.unwrap_err();

        assert!(matches!(err, CastingError::Auth { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_get_key_picks_up_rotated_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "keys": [{"kty": "OKP", "kid": "old-key", "crv": "Ed25519", "x": "AA"}]
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body()))
            .mount(&server)
            .await;

        let client = JwksClient::new(format!("{}/.well-known/jwks.json", server.uri()))
            .with_min_refresh_interval(Duration::ZERO);

        client.get_key("old-key").await.unwrap();
        let rotated = client.get_key("ed-key-01").await.unwrap();

        assert_eq!(rotated.kty, "OKP");
    }

    #[tokio::test]
    async fn test_get_key_refresh_failure_with_fresh_cache_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body()))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = JwksClient::new(format!("{}/.well-known/jwks.json", server.uri()))
            .with_min_refresh_interval(Duration::ZERO);

        client.get_key("rsa-key-01").await.unwrap();
        let err = client.get_key("rotated-away").await.unwrap_err();
        assert!(matches!(err, CastingError::Auth { status: 401, .. }));

        // Cached keys keep working after the failed refresh
        assert_eq!(client.get_key("ed-key-01").await.unwrap().kty, "OKP");
    }

    #[tokio::test]
    async fn test_concurrent_cold_misses_share_one_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(jwks_body())
                    .set_delay(Duration::from_millis(50)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = Arc::new(JwksClient::new(format!(
            "{}/.well-known/jwks.json",
            server.uri()
        )));

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..20 {
            let client = Arc::clone(&client);
            tasks.spawn(async move { client.get_key(&format!("bogus-{i}")).await });
        }

        while let Some(result) = tasks.join_next().await {
            let err = result.unwrap().unwrap_err();
            assert!(matches!(err, CastingError::Auth { status: 401, .. }));
        }
    }

    #[tokio::test]
    async fn test_get_key_expired_cache_refetches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body()))
            .expect(2)
            .mount(&server)
            .await;

        let client = JwksClient::with_ttl(
            format!("{}/.well-known/jwks.json", server.uri()),
            Duration::from_millis(10),
        );

        client.get_key("rsa-key-01").await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        client.get_key("rsa-key-01").await.unwrap();
    }

    #[tokio::test]
    async fn test_get_key_endpoint_error_is_service_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = JwksClient::new(format!("{}/.well-known/jwks.json", server.uri()));

        let err = client.get_key("rsa-key-01").await.unwrap_err();
        assert!(matches!(err, CastingError::ServiceUnavailable(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_get_key_invalid_document_is_service_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = JwksClient::new(format!("{}/.well-known/jwks.json", server.uri()));

        let err = client.get_key("rsa-key-01").await.unwrap_err();
        assert!(matches!(err, CastingError::ServiceUnavailable(_)));
    }
}
