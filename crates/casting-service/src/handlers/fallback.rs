//! Envelope responses for requests the router itself rejects.

use crate::errors::CastingError;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

/// Router fallback for unknown paths.
pub async fn not_found() -> CastingError {
    CastingError::NotFound("route".to_string())
}

/// Replace the empty-body responses produced by the router and the
/// timeout layer with the JSON envelope.
///
/// A 405 keeps the `Allow` header the router computed. A 408 from the
/// timeout layer becomes the 500 envelope.
pub async fn envelope_bare_errors(response: Response) -> Response {
    match response.status() {
        StatusCode::METHOD_NOT_ALLOWED => {
            let allow = response.headers().get(header::ALLOW).cloned();
            let mut envelope = CastingError::MethodNotAllowed.into_response();
            if let Some(allow) = allow {
                envelope.headers_mut().insert(header::ALLOW, allow);
            }
            envelope
        }
        StatusCode::REQUEST_TIMEOUT => {
            CastingError::ServiceUnavailable("request timed out".to_string()).into_response()
        }
        _ => response,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_not_found_envelope() {
        let response = not_found().await.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_method_not_allowed_is_rewritten() {
        let original = Response::builder()
            .status(StatusCode::METHOD_NOT_ALLOWED)
            .header(header::ALLOW, "GET,POST")
            .body(Body::empty())
            .unwrap();

        let response = envelope_bare_errors(original).await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(header::ALLOW).unwrap(), "GET,POST");

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], 405);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_request_timeout_becomes_internal_error() {
        let original = Response::builder()
            .status(StatusCode::REQUEST_TIMEOUT)
            .body(Body::empty())
            .unwrap();

        let response = envelope_bare_errors(original).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"success": false, "error": 500, "message": "internal server error"})
        );
    }

    #[tokio::test]
    async fn test_other_responses_pass_through() {
        let original = Response::builder()
            .status(StatusCode::OK)
            .body(Body::from("fine"))
            .unwrap();

        let response = envelope_bare_errors(original).await;

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes.to_vec(), b"fine".to_vec());
    }
}
