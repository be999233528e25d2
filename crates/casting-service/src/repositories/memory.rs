//! In-memory implementation of `CastingStore`.
//!
//! Used by integration tests and local runs without Postgres. Ids are
//! assigned from per-table counters and never reused, matching SERIAL.

use crate::errors::CastingError;
use crate::models::{Actor, Movie, NewActor, NewMovie};
use crate::repositories::CastingStore;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

#[derive(Default)]
struct Tables {
    actors: BTreeMap<i32, Actor>,
    movies: BTreeMap<i32, Movie>,
    next_actor_id: i32,
    next_movie_id: i32,
}

impl Tables {
    fn allocate_actor_id(&mut self) -> i32 {
        self.next_actor_id = self.next_actor_id.saturating_add(1);
        self.next_actor_id
    }

    fn allocate_movie_id(&mut self) -> i32 {
        self.next_movie_id = self.next_movie_id.saturating_add(1);
        self.next_movie_id
    }
}

/// Store backed by ordered maps behind an async mutex.
#[derive(Default)]
pub struct InMemoryCastingStore {
    tables: Mutex<Tables>,
    call_count: AtomicUsize,
    return_error: bool,
}

impl InMemoryCastingStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the fixture rows from the seed migration:
    /// three actors, three movies released today.
    pub fn seeded() -> Self {
        let today = Utc::now().date_naive();
        let mut tables = Tables::default();

        for (name, age) in [("Anant", 29), ("SRK", 55), ("TomCrusie", 58)] {
            let id = tables.allocate_actor_id();
            tables.actors.insert(
                id,
                Actor {
                    id,
                    name: name.to_string(),
                    gender: Some("Male".to_string()),
                    age,
                },
            );
        }

        for title in ["Steps to code", "My name is Khan", "MI-3"] {
            let id = tables.allocate_movie_id();
            tables.movies.insert(
                id,
                Movie {
                    id,
                    title: title.to_string(),
                    release_date: today,
                },
            );
        }

        Self {
            tables: Mutex::new(tables),
            ..Self::default()
        }
    }

    /// Create a store whose every call fails with a database error.
    pub fn failing() -> Self {
        Self {
            return_error: true,
            ..Self::default()
        }
    }

    /// Number of store calls made.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn begin(&self) -> Result<(), CastingError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if self.return_error {
            return Err(CastingError::Database(
                "in-memory store configured to fail".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CastingStore for InMemoryCastingStore {
    async fn list_actors(&self) -> Result<Vec<Actor>, CastingError> {
        self.begin()?;
        Ok(self.tables.lock().await.actors.values().cloned().collect())
    }

    async fn get_actor(&self, id: i32) -> Result<Option<Actor>, CastingError> {
        self.begin()?;
        Ok(self.tables.lock().await.actors.get(&id).cloned())
    }

    async fn insert_actor(&self, actor: &NewActor) -> Result<Actor, CastingError> {
        self.begin()?;
        let mut tables = self.tables.lock().await;
        let id = tables.allocate_actor_id();
        let record = Actor {
            id,
            name: actor.name.clone(),
            gender: actor.gender.clone(),
            age: actor.age,
        };
        tables.actors.insert(id, record.clone());
        Ok(record)
    }

    async fn update_actor(
        &self,
        id: i32,
        actor: &NewActor,
    ) -> Result<Option<Actor>, CastingError> {
        self.begin()?;
        let mut tables = self.tables.lock().await;
        Ok(tables.actors.get_mut(&id).map(|stored| {
            stored.name.clone_from(&actor.name);
            stored.age = actor.age;
            stored.gender.clone_from(&actor.gender);
            stored.clone()
        }))
    }

    async fn delete_actor(&self, id: i32) -> Result<bool, CastingError> {
        self.begin()?;
        Ok(self.tables.lock().await.actors.remove(&id).is_some())
    }

    async fn list_movies(&self) -> Result<Vec<Movie>, CastingError> {
        self.begin()?;
        Ok(self.tables.lock().await.movies.values().cloned().collect())
    }

    async fn get_movie(&self, id: i32) -> Result<Option<Movie>, CastingError> {
        self.begin()?;
        Ok(self.tables.lock().await.movies.get(&id).cloned())
    }

    async fn insert_movie(&self, movie: &NewMovie) -> Result<Movie, CastingError> {
        self.begin()?;
        let mut tables = self.tables.lock().await;
        let id = tables.allocate_movie_id();
        let record = Movie {
            id,
            title: movie.title.clone(),
            release_date: movie.release_date,
        };
        tables.movies.insert(id, record.clone());
        Ok(record)
    }

    async fn update_movie(
        &self,
        id: i32,
        movie: &NewMovie,
    ) -> Result<Option<Movie>, CastingError> {
        self.begin()?;
        let mut tables = self.tables.lock().await;
        Ok(tables.movies.get_mut(&id).map(|stored| {
            stored.title.clone_from(&movie.title);
            stored.release_date = movie.release_date;
            stored.clone()
        }))
    }

    async fn delete_movie(&self, id: i32) -> Result<bool, CastingError> {
        self.begin()?;
        Ok(self.tables.lock().await.movies.remove(&id).is_some())
    }
}
