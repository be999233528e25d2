//! PostgreSQL implementation of `CastingStore`.
//!
//! All queries use parameterized statements. Deletes are a single
//! `DELETE ... RETURNING` so concurrent duplicate deletes resolve to
//! exactly one success. Casting rows cascade with their actor or movie.

use crate::errors::CastingError;
use crate::models::{Actor, Movie, NewActor, NewMovie};
use crate::observability::metrics;
use crate::repositories::CastingStore;
use sqlx::PgPool;
use std::future::Future;
use std::time::Instant;
use tracing::instrument;

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgCastingStore {
    pool: PgPool,
}

impl PgCastingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Run a query, recording its duration and outcome under `operation`.
async fn timed<T, F>(operation: &'static str, query: F) -> Result<T, CastingError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    let start = Instant::now();
    let result = query.await;
    let status = if result.is_ok() { "success" } else { "error" };
    metrics::record_db_query(operation, status, start.elapsed());
    result.map_err(CastingError::from)
}

#[async_trait::async_trait]
impl CastingStore for PgCastingStore {
    #[instrument(skip_all, name = "casting.repo.list_actors")]
    async fn list_actors(&self) -> Result<Vec<Actor>, CastingError> {
        timed(
            "list_actors",
            sqlx::query_as::<_, Actor>("SELECT id, name, gender, age FROM actors ORDER BY id")
                .fetch_all(&self.pool),
        )
        .await
    }

    #[instrument(skip_all, name = "casting.repo.get_actor", fields(actor_id = id))]
    async fn get_actor(&self, id: i32) -> Result<Option<Actor>, CastingError> {
        timed(
            "get_actor",
            sqlx::query_as::<_, Actor>("SELECT id, name, gender, age FROM actors WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    #[instrument(skip_all, name = "casting.repo.insert_actor")]
    async fn insert_actor(&self, actor: &NewActor) -> Result<Actor, CastingError> {
        timed(
            "insert_actor",
            sqlx::query_as::<_, Actor>(
                r#"
                INSERT INTO actors (name, age, gender)
                VALUES ($1, $2, $3)
                RETURNING id, name, gender, age
                "#,
            )
            .bind(&actor.name)
            .bind(actor.age)
            .bind(&actor.gender)
            .fetch_one(&self.pool),
        )
        .await
    }

    #[instrument(skip_all, name = "casting.repo.update_actor", fields(actor_id = id))]
    async fn update_actor(
        &self,
        id: i32,
        actor: &NewActor,
    ) -> Result<Option<Actor>, CastingError> {
        timed(
            "update_actor",
            sqlx::query_as::<_, Actor>(
                r#"
                UPDATE actors
                SET name = $2, age = $3, gender = $4
                WHERE id = $1
                RETURNING id, name, gender, age
                "#,
            )
            .bind(id)
            .bind(&actor.name)
            .bind(actor.age)
            .bind(&actor.gender)
            .fetch_optional(&self.pool),
        )
        .await
    }

    #[instrument(skip_all, name = "casting.repo.delete_actor", fields(actor_id = id))]
    async fn delete_actor(&self, id: i32) -> Result<bool, CastingError> {
        let deleted = timed(
            "delete_actor",
            sqlx::query_scalar::<_, i32>("DELETE FROM actors WHERE id = $1 RETURNING id")
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await?;
        Ok(deleted.is_some())
    }

    #[instrument(skip_all, name = "casting.repo.list_movies")]
    async fn list_movies(&self) -> Result<Vec<Movie>, CastingError> {
        timed(
            "list_movies",
            sqlx::query_as::<_, Movie>("SELECT id, title, release_date FROM movies ORDER BY id")
                .fetch_all(&self.pool),
        )
        .await
    }

    #[instrument(skip_all, name = "casting.repo.get_movie", fields(movie_id = id))]
    async fn get_movie(&self, id: i32) -> Result<Option<Movie>, CastingError> {
        timed(
            "get_movie",
            sqlx::query_as::<_, Movie>("SELECT id, title, release_date FROM movies WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    #[instrument(skip_all, name = "casting.repo.insert_movie")]
    async fn insert_movie(&self, movie: &NewMovie) -> Result<Movie, CastingError> {
        timed(
            "insert_movie",
            sqlx::query_as::<_, Movie>(
                r#"
                INSERT INTO movies (title, release_date)
                VALUES ($1, $2)
                RETURNING id, title, release_date
                "#,
            )
            .bind(&movie.title)
            .bind(movie.release_date)
            .fetch_one(&self.pool),
        )
        .await
    }

    #[instrument(skip_all, name = "casting.repo.update_movie", fields(movie_id = id))]
    async fn update_movie(
        &self,
        id: i32,
        movie: &NewMovie,
    ) -> Result<Option<Movie>, CastingError> {
        timed(
            "update_movie",
            sqlx::query_as::<_, Movie>(
                r#"
                UPDATE movies
                SET title = $2, release_date = $3
                WHERE id = $1
                RETURNING id, title, release_date
                "#,
            )
            .bind(id)
            .bind(&movie.title)
            .bind(movie.release_date)
            .fetch_optional(&self.pool),
        )
        .await
    }

    #[instrument(skip_all, name = "casting.repo.delete_movie", fields(movie_id = id))]
    async fn delete_movie(&self, id: i32) -> Result<bool, CastingError> {
        let deleted = timed(
            "delete_movie",
            sqlx::query_scalar::<_, i32>("DELETE FROM movies WHERE id = $1 RETURNING id")
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await?;
        Ok(deleted.is_some())
    }
}
