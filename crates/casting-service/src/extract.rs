//! Request body extraction.

use crate::errors::CastingError;
use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header, HeaderMap},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// A JSON request body that may be absent.
///
/// An empty body, a JSON value that is not an object, and an empty object
/// are all treated as "no body" (`JsonBody(None)`), as is any body not sent
/// as `application/json` (or an `application/*+json` subtype). Syntactically
/// invalid JSON is rejected with `BadRequest`.
#[derive(Debug)]
pub struct JsonBody(pub Option<Map<String, Value>>);

impl JsonBody {
    /// Deserialize the body into a typed payload.
    ///
    /// Returns `Ok(None)` when there is no body. Type errors are returned
    /// to the caller, which decides how to report them.
    pub fn into_payload<T: DeserializeOwned>(self) -> Result<Option<T>, serde_json::Error> {
        self.0
            .map(|fields| serde_json::from_value(Value::Object(fields)))
            .transpose()
    }
}

#[axum::async_trait]
impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = CastingError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_json_content_type(req.headers()) {
            tracing::debug!(
                target: "casting.extract",
                content_type = ?req.headers().get(header::CONTENT_TYPE),
                "Ignoring request body without a JSON content type"
            );
            return Ok(JsonBody(None));
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| CastingError::BadRequest(e.body_text()))?;

        Self::from_bytes(&bytes)
    }
}

/// Whether the request declares a JSON body. Parameters such as `charset`
/// are ignored and the media type is matched case-insensitively.
fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    else {
        return false;
    };

    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match media_type.strip_prefix("application/") {
        Some("json") => true,
        Some(subtype) => subtype.ends_with("+json"),
        None => false,
    }
}

impl JsonBody {
    fn from_bytes(bytes: &[u8]) -> Result<Self, CastingError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(JsonBody(None));
        }

        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| CastingError::BadRequest(format!("invalid JSON body: {e}")))?;

        match value {
            Value::Object(fields) if !fields.is_empty() => Ok(JsonBody(Some(fields))),
            _ => Ok(JsonBody(None)),
        }
    }
}
