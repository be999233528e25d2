//! Repository layer for the casting service.
//!
//! Handlers talk to persistence through the `CastingStore` trait so that the
//! HTTP layer can run against Postgres in production and an in-memory store
//! in tests.

pub mod memory;
pub mod pg;

pub use memory::InMemoryCastingStore;
pub use pg::PgCastingStore;

use crate::errors::CastingError;
use crate::models::{Actor, Movie, NewActor, NewMovie};

/// Persistence operations for actors and movies.
///
/// Every method is a single unit of work; there are no multi-call
/// transactions.
#[async_trait::async_trait]
pub trait CastingStore: Send + Sync {
    /// All actors ordered by id.
    async fn list_actors(&self) -> Result<Vec<Actor>, CastingError>;

    async fn get_actor(&self, id: i32) -> Result<Option<Actor>, CastingError>;

    /// Insert an actor and return the stored record with its new id.
    async fn insert_actor(&self, actor: &NewActor) -> Result<Actor, CastingError>;

    /// Overwrite an actor's fields. Returns `None` if the id does not exist.
    async fn update_actor(&self, id: i32, actor: &NewActor)
        -> Result<Option<Actor>, CastingError>;

    /// Delete an actor. Returns `false` if the id did not exist.
    async fn delete_actor(&self, id: i32) -> Result<bool, CastingError>;

    /// All movies ordered by id.
    async fn list_movies(&self) -> Result<Vec<Movie>, CastingError>;

    async fn get_movie(&self, id: i32) -> Result<Option<Movie>, CastingError>;

    /// Insert a movie and return the stored record with its new id.
    async fn insert_movie(&self, movie: &NewMovie) -> Result<Movie, CastingError>;

    /// Overwrite a movie's fields. Returns `None` if the id does not exist.
    async fn update_movie(&self, id: i32, movie: &NewMovie)
        -> Result<Option<Movie>, CastingError>;

    /// Delete a movie. Returns `false` if the id did not exist.
    async fn delete_movie(&self, id: i32) -> Result<bool, CastingError>;
}
