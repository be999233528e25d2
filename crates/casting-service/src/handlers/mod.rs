//! HTTP request handlers for the casting service.

pub mod actors;
pub mod fallback;
pub mod health;
pub mod metrics;
pub mod movies;

pub use actors::{create_actor, delete_actor, list_actors, update_actor};
pub use fallback::{envelope_bare_errors, not_found};
pub use health::health_check;
pub use metrics::metrics_handler;
pub use movies::{create_movie, delete_movie, list_movies, update_movie};

use crate::errors::CastingError;

/// Parse a record id from the path.
///
/// A non-numeric id cannot name any record, so it is reported as not found.
pub(crate) fn parse_id(raw: &str, resource: &str) -> Result<i32, CastingError> {
    raw.parse::<i32>()
        .map_err(|_| CastingError::NotFound(format!("{resource} {raw}")))
}
