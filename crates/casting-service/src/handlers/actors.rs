//! Actor handlers.
//!
//! Every route here is wrapped by the permission gate, so handlers can rely
//! on verified `Claims` being present in request extensions.

use crate::auth::Claims;
use crate::errors::CastingError;
use crate::extract::JsonBody;
use crate::handlers::parse_id;
use crate::models::{
    ActorListResponse, ActorPayload, ActorUpdatedResponse, CreatedResponse, DeletedResponse,
};
use crate::pagination::{paginate, PageQuery};
use crate::routes::AppState;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Extension, Json,
};
use std::sync::Arc;
use tracing::instrument;

// ============================================================================
// Handler: GET /actors
// ============================================================================

/// Handler for GET /actors?page=N
///
/// # Response
///
/// - 200 OK: `{success, actors: [...]}` with up to 10 actors
/// - 404 Not Found: the requested page is empty
#[instrument(skip_all, name = "casting.actors.list")]
pub async fn list_actors(
    State(state): State<Arc<AppState>>,
    query: Option<Query<PageQuery>>,
) -> Result<Response, CastingError> {
    let page = query.map(|Query(q)| q.page()).unwrap_or(1);

    let actors = state.store.list_actors().await?;
    let window = paginate(&actors, page);

    if window.is_empty() {
        return Err(CastingError::NotFound(format!("actors page {page}")));
    }

    Ok(Json(ActorListResponse {
        success: true,
        actors: window,
    })
    .into_response())
}

// ============================================================================
// Handler: POST /actors
// ============================================================================

/// Handler for POST /actors
///
/// # Request Body
///
/// ```json
/// { "name": "Andy", "age": 29, "gender": "Male" }
/// ```
///
/// # Response
///
/// - 200 OK: `{success, created: <id>}`
/// - 400 Bad Request: no body
/// - 422 Unprocessable Entity: missing, empty, or mistyped fields
#[instrument(skip_all, name = "casting.actors.create")]
pub async fn create_actor(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    body: JsonBody,
) -> Result<Json<CreatedResponse<i32>>, CastingError> {
    let payload: ActorPayload = body
        .into_payload()
        .map_err(|e| CastingError::UnprocessableEntity(e.to_string()))?
        .ok_or_else(|| CastingError::BadRequest("actor body is required".to_string()))?;

    let new_actor = payload.into_new_actor()?;
    let actor = state.store.insert_actor(&new_actor).await?;

    tracing::info!(target: "casting.handlers.actors", actor_id = actor.id, issuer = %claims.iss, "Actor created");

    Ok(Json(CreatedResponse {
        success: true,
        created: actor.id,
    }))
}

// ============================================================================
// Handler: PATCH /actors/{id}
// ============================================================================

/// Handler for PATCH /actors/{id}
///
/// Fields present in the body overwrite the stored ones; `gender: null`
/// clears the gender.
///
/// # Response
///
/// - 200 OK: `{success, updated: <name>, actor: [record]}`
/// - 400 Bad Request: no body
/// - 404 Not Found: unknown or non-numeric id
/// - 422 Unprocessable Entity: merged record is invalid
#[instrument(skip_all, name = "casting.actors.update", fields(actor_id = tracing::field::Empty))]
pub async fn update_actor(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    body: JsonBody,
) -> Result<Json<ActorUpdatedResponse>, CastingError> {
    let payload: ActorPayload = body
        .into_payload()
        .map_err(|e| CastingError::UnprocessableEntity(e.to_string()))?
        .ok_or_else(|| CastingError::BadRequest("actor body is required".to_string()))?;

    let actor_id = parse_id(&id, "actor")?;
    tracing::Span::current().record("actor_id", actor_id);
    let current = state
        .store
        .get_actor(actor_id)
        .await?
        .ok_or_else(|| CastingError::NotFound(format!("actor {actor_id}")))?;

    let merged = payload.merge_into(&current)?;
    let actor = state
        .store
        .update_actor(actor_id, &merged)
        .await?
        .ok_or_else(|| CastingError::NotFound(format!("actor {actor_id}")))?;

    tracing::info!(target: "casting.handlers.actors", actor_id, issuer = %claims.iss, "Actor updated");

    Ok(Json(ActorUpdatedResponse {
        success: true,
        updated: actor.name.clone(),
        actor: vec![actor],
    }))
}

// ============================================================================
// Handler: DELETE /actors/{id}
// ============================================================================

/// Handler for DELETE /actors/{id}
///
/// # Response
///
/// - 200 OK: `{success, deleted: "<id>"}`
/// - 404 Not Found: unknown or non-numeric id
#[instrument(skip_all, name = "casting.actors.delete", fields(actor_id = tracing::field::Empty))]
pub async fn delete_actor(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, CastingError> {
    let actor_id = parse_id(&id, "actor")?;
    tracing::Span::current().record("actor_id", actor_id);

    if !state.store.delete_actor(actor_id).await? {
        return Err(CastingError::NotFound(format!("actor {actor_id}")));
    }

    tracing::info!(target: "casting.handlers.actors", actor_id, issuer = %claims.iss, "Actor deleted");

    Ok(Json(DeletedResponse {
        success: true,
        deleted: id,
    }))
}
