//! HTTP routes for the casting service.
//!
//! Defines the Axum router and application state.

use crate::auth::permissions::{
    CREATE_ACTORS, CREATE_MOVIES, DELETE_ACTORS, DELETE_MOVIES, GET_ACTORS, GET_MOVIES,
    UPDATE_ACTORS, UPDATE_MOVIES,
};
use crate::auth::{JwksClient, JwtValidator};
use crate::config::Config;
use crate::errors::CastingError;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_permission, PermissionGate};
use crate::repositories::CastingStore;
use axum::{
    handler::Handler,
    http::{header, Method},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, patch},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Request timeout applied to every route.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Actor and movie persistence.
    pub store: Arc<dyn CastingStore>,

    /// Service configuration.
    pub config: Config,
}

/// CORS policy: any origin, the verbs the API serves, and the two request
/// headers clients send.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([
            Method::GET,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Render a handler panic as the 500 envelope.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    tracing::error!(target: "casting.routes", panic = %detail, "Handler panicked");
    CastingError::Internal.into_response()
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - `/actors`, `/actors/:id` - Actor CRUD, each verb gated by its permission
/// - `/movies`, `/movies/:id` - Movie CRUD, each verb gated by its permission
/// - JSON 404 for unknown paths and JSON 405 for unsupported verbs
/// - CORS, TraceLayer, 30 second timeout, panic recovery
/// - HTTP metrics middleware (outermost)
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let jwks_client = Arc::new(JwksClient::with_ttl(
        state.config.jwks_url.clone(),
        Duration::from_secs(state.config.jwks_cache_ttl_seconds),
    ));
    let jwt_validator = Arc::new(JwtValidator::new(
        jwks_client,
        state.config.jwt_issuer.clone(),
        state.config.jwt_audience.clone(),
        state.config.jwt_clock_skew_seconds,
    ));

    // Each handler carries its own gate so that verbs sharing a path can
    // require different permissions.
    let gate = |permission: &'static str| {
        middleware::from_fn_with_state(
            Arc::new(PermissionGate::new(jwt_validator.clone(), permission)),
            require_permission,
        )
    };

    let resource_routes = Router::new()
        .route(
            "/actors",
            get(handlers::list_actors.layer(gate(GET_ACTORS)))
                .post(handlers::create_actor.layer(gate(CREATE_ACTORS))),
        )
        .route(
            "/actors/:id",
            patch(handlers::update_actor.layer(gate(UPDATE_ACTORS)))
                .delete(handlers::delete_actor.layer(gate(DELETE_ACTORS))),
        )
        .route(
            "/movies",
            get(handlers::list_movies.layer(gate(GET_MOVIES)))
                .post(handlers::create_movie.layer(gate(CREATE_MOVIES))),
        )
        .route(
            "/movies/:id",
            patch(handlers::update_movie.layer(gate(UPDATE_MOVIES)))
                .delete(handlers::delete_movie.layer(gate(DELETE_MOVIES))),
        )
        .route("/health", get(handlers::health_check))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let router = resource_routes
        .merge(metrics_routes)
        .fallback(handlers::not_found);

    with_service_layers(router, REQUEST_TIMEOUT)
}

/// Wrap a router in the cross-cutting layers.
///
/// Layer order (bottom-to-top execution):
/// 1. CatchPanicLayer - Turn handler panics into 500 envelopes (innermost)
/// 2. TimeoutLayer - Timeout the request with an empty 408
/// 3. map_response - Rewrite empty 405s and 408s as envelopes
/// 4. TraceLayer - Log request details
/// 5. CorsLayer - Answer preflights, add CORS headers
/// 6. http_metrics_middleware - Record ALL responses (outermost)
fn with_service_layers(router: Router, request_timeout: Duration) -> Router {
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::map_response(handlers::envelope_bare_errors))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .layer(middleware::from_fn(http_metrics_middleware))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::repositories::InMemoryCastingStore;
    use axum::{body::Body, http::Request, http::StatusCode};
    use http_body_util::BodyExt;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::collections::HashMap;
    use tower::ServiceExt;

    fn test_router() -> Router {
        let vars = HashMap::from([
            (
                "DATABASE_URL".to_string(),
                "postgresql://localhost/casting_test".to_string(),
            ),
            ("AUTH0_DOMAIN".to_string(), "casting.test".to_string()),
            ("API_AUDIENCE".to_string(), "casting-api".to_string()),
            // Nothing listens here; these tests never reach the gate's JWKS fetch
            (
                "JWKS_URL".to_string(),
                "http://127.0.0.1:9/.well-known/jwks.json".to_string(),
            ),
        ]);
        let state = Arc::new(AppState {
            store: Arc::new(InMemoryCastingStore::seeded()),
            config: Config::from_vars(&vars).unwrap(),
        });
        let handle = PrometheusBuilder::new().build_recorder().handle();
        build_routes(state, handle)
    }

    async fn send(method: &str, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = test_router().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, bytes.to_vec())
    }

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let (status, _, body) = send("GET", "/health").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "health": "APP is up"}));
    }

    #[tokio::test]
    async fn test_unknown_route_returns_envelope() {
        let (status, _, body) = send("GET", "/castings").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], 404);
        assert_eq!(json["message"], "resource not found");
    }

    #[tokio::test]
    async fn test_wrong_verb_returns_envelope() {
        let (status, headers, body) = send("PUT", "/actors").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert!(headers.get(header::ALLOW).is_some());

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], 405);
        assert_eq!(json["message"], "method not allowed");
    }

    #[tokio::test]
    async fn test_missing_token_is_rejected_before_jwks() {
        let (status, headers, body) = send("GET", "/actors").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(headers.get(header::WWW_AUTHENTICATE).is_some());

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], 401);
        assert_eq!(json["message"], "authentication failed");
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/actors")
            .header(header::ORIGIN, "https://casting.example")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
            .header(
                header::ACCESS_CONTROL_REQUEST_HEADERS,
                "authorization,content-type",
            )
            .body(Body::empty())
            .unwrap();

        let response = test_router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
        let methods = headers
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(methods.contains("PATCH"));
        assert!(methods.contains("DELETE"));
    }

    #[tokio::test]
    async fn test_metrics_endpoint_is_public() {
        let (status, _, _) = send("GET", "/metrics").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_slow_handler_times_out_with_envelope() {
        let router = with_service_layers(
            Router::new().route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    "too late"
                }),
            ),
            Duration::from_millis(50),
        );
        let request = Request::builder().uri("/slow").body(Body::empty()).unwrap();

        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "error": 500, "message": "internal server error"})
        );
    }
}
