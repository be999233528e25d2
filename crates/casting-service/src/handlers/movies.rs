//! Movie handlers.
//!
//! Unlike actors, invalid movie bodies are reported as 400 rather than 422.

use crate::auth::Claims;
use crate::errors::CastingError;
use crate::extract::JsonBody;
use crate::handlers::parse_id;
use crate::models::{
    CreatedResponse, DeletedResponse, MovieEditedResponse, MovieListResponse, MoviePayload,
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

fn movie_payload(body: JsonBody) -> Result<MoviePayload, CastingError> {
    body.into_payload()
        .map_err(|e| CastingError::BadRequest(e.to_string()))?
        .ok_or_else(|| CastingError::BadRequest("movie body is required".to_string()))
}

/// Handler for GET /movies?page=N
///
/// # Response
///
/// - 200 OK: `{success, movies: [...]}` with up to 10 movies
/// - 404 Not Found: the requested page is empty
#[instrument(skip_all, name = "casting.movies.list")]
pub async fn list_movies(
    State(state): State<Arc<AppState>>,
    query: Option<Query<PageQuery>>,
) -> Result<Response, CastingError> {
    let page = query.map(|Query(q)| q.page()).unwrap_or(1);

    let movies = state.store.list_movies().await?;
    let window = paginate(&movies, page);

    if window.is_empty() {
        return Err(CastingError::NotFound(format!("movies page {page}")));
    }

    Ok(Json(MovieListResponse {
        success: true,
        movies: window,
    })
    .into_response())
}

/// Handler for POST /movies
///
/// # Request Body
///
/// ```json
/// { "title": "Do Little", "release_date": "2026-10-19" }
/// ```
///
/// # Response
///
/// - 200 OK: `{success, created: <title>}`
/// - 400 Bad Request: no body, missing fields, or unparseable date
#[instrument(skip_all, name = "casting.movies.create")]
pub async fn create_movie(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    body: JsonBody,
) -> Result<Json<CreatedResponse<String>>, CastingError> {
    let new_movie = movie_payload(body)?.into_new_movie()?;
    let movie = state.store.insert_movie(&new_movie).await?;

    tracing::info!(target: "casting.handlers.movies", movie_id = movie.id, issuer = %claims.iss, "Movie created");

    Ok(Json(CreatedResponse {
        success: true,
        created: movie.title,
    }))
}

/// Handler for PATCH /movies/{id}
///
/// # Response
///
/// - 200 OK: `{success, edited: <id>, movie: [record]}`
/// - 400 Bad Request: no body or invalid merged values
/// - 404 Not Found: unknown or non-numeric id
#[instrument(skip_all, name = "casting.movies.update", fields(movie_id = tracing::field::Empty))]
pub async fn update_movie(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    body: JsonBody,
) -> Result<Json<MovieEditedResponse>, CastingError> {
    let payload = movie_payload(body)?;

    let movie_id = parse_id(&id, "movie")?;
    tracing::Span::current().record("movie_id", movie_id);
    let current = state
        .store
        .get_movie(movie_id)
        .await?
        .ok_or_else(|| CastingError::NotFound(format!("movie {movie_id}")))?;

    let merged = payload.merge_into(&current)?;
    let movie = state
        .store
        .update_movie(movie_id, &merged)
        .await?
        .ok_or_else(|| CastingError::NotFound(format!("movie {movie_id}")))?;

    tracing::info!(target: "casting.handlers.movies", movie_id, issuer = %claims.iss, "Movie updated");

    Ok(Json(MovieEditedResponse {
        success: true,
        edited: movie.id,
        movie: vec![movie],
    }))
}

/// Handler for DELETE /movies/{id}
///
/// # Response
///
/// - 200 OK: `{success, deleted: "<id>"}`
/// - 404 Not Found: unknown or non-numeric id
#[instrument(skip_all, name = "casting.movies.delete", fields(movie_id = tracing::field::Empty))]
pub async fn delete_movie(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, CastingError> {
    let movie_id = parse_id(&id, "movie")?;
    tracing::Span::current().record("movie_id", movie_id);

    if !state.store.delete_movie(movie_id).await? {
        return Err(CastingError::NotFound(format!("movie {movie_id}")));
    }

    tracing::info!(target: "casting.handlers.movies", movie_id, issuer = %claims.iss, "Movie deleted");

    Ok(Json(DeletedResponse {
        success: true,
        deleted: id,
    }))
}
