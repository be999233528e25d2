//! Test server harness for E2E testing
//!
//! Provides `TestCastingServer` for spawning real casting service instances
//! in tests, backed by a mock JWKS endpoint that publishes the fixture keys.

use crate::crypto_fixtures::{test_ed25519_key, test_rsa_key, TestSigningKey, TEST_ED25519_KID};
use crate::token_builders::{Role, TestTokenBuilder};
use casting_service::config::Config;
use casting_service::repositories::{CastingStore, InMemoryCastingStore};
use casting_service::routes::{self, AppState};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Auth0 tenant domain the test server trusts.
pub const TEST_AUTH0_DOMAIN: &str = "casting-test.auth0.local";

/// Audience the test server requires.
pub const TEST_AUDIENCE: &str = "casting-agency";

const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Test harness for spawning the casting service in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_list_actors() -> Result<()> {
///     let server = TestCastingServer::spawn().await?;
///
///     let response = reqwest::Client::new()
///         .get(format!("{}/actors", server.url()))
///         .bearer_auth(server.token(Role::CastingAssistant))
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestCastingServer {
    addr: SocketAddr,
    config: Config,
    jwks_server: MockServer,
    ed25519_key: TestSigningKey,
    rsa_key: TestSigningKey,
    _handle: JoinHandle<()>,
}

impl TestCastingServer {
    /// Spawn a server over the seeded in-memory store (three actors, three
    /// movies).
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_store(Arc::new(InMemoryCastingStore::seeded())).await
    }

    /// Spawn a server over the given store.
    ///
    /// The server will:
    /// - Serve both fixture keys from a wiremock JWKS endpoint
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn_with_store(store: Arc<dyn CastingStore>) -> Result<Self, anyhow::Error> {
        let ed25519_key = test_ed25519_key(1, TEST_ED25519_KID)?;
        let rsa_key = test_rsa_key()?;

        let jwks_server = MockServer::start().await;
        mount_jwks(&jwks_server, &[&ed25519_key, &rsa_key]).await;

        let vars = HashMap::from([
            (
                "DATABASE_URL".to_string(),
                "postgresql://test/test".to_string(),
            ),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("AUTH0_DOMAIN".to_string(), TEST_AUTH0_DOMAIN.to_string()),
            ("API_AUDIENCE".to_string(), TEST_AUDIENCE.to_string()),
            (
                "JWKS_URL".to_string(),
                format!("{}{}", jwks_server.uri(), JWKS_PATH),
            ),
        ]);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let state = Arc::new(AppState {
            store,
            config: config.clone(),
        });

        // Local recorder handle; tests never install a global recorder
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();

        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            jwks_server,
            ed25519_key,
            rsa_key,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The mock JWKS endpoint, for request-count assertions.
    pub fn jwks_server(&self) -> &MockServer {
        &self.jwks_server
    }

    /// The Ed25519 key published in the JWKS.
    pub fn ed25519_key(&self) -> &TestSigningKey {
        &self.ed25519_key
    }

    /// The RSA key published in the JWKS.
    pub fn rsa_key(&self) -> &TestSigningKey {
        &self.rsa_key
    }

    /// Token builder preset with this server's issuer and audience.
    pub fn token_builder(&self) -> TestTokenBuilder {
        TestTokenBuilder::new(&self.config.jwt_issuer, &self.config.jwt_audience)
    }

    /// A valid Ed25519-signed token for `role`.
    pub fn token(&self, role: Role) -> String {
        self.token_builder()
            .with_role(role)
            .sign(&self.ed25519_key)
    }

    /// Replace the JWKS endpoint with one that answers 503.
    ///
    /// Keys already cached by the server stay usable until the cache expires.
    pub async fn fail_jwks(&self) {
        self.jwks_server.reset().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(503))
            .mount(&self.jwks_server)
            .await;
    }
}

impl Drop for TestCastingServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

async fn mount_jwks(server: &MockServer, keys: &[&TestSigningKey]) {
    let jwks = serde_json::json!({
        "keys": keys.iter().map(|k| k.jwk()).collect::<Vec<_>>(),
    });

    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks))
        .mount(server)
        .await;
}
