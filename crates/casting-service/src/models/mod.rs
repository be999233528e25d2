//! Casting service models.
//!
//! Contains the persisted records, request payloads, and response bodies.

use crate::errors::CastingError;
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

/// Actor record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Actor {
    pub id: i32,
    pub name: String,
    pub gender: Option<String>,
    pub age: i32,
}

/// Movie record. `release_date` serializes as `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Movie {
    pub id: i32,
    pub title: String,
    pub release_date: NaiveDate,
}

/// Validated actor fields ready to be inserted or written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActor {
    pub name: String,
    pub age: i32,
    pub gender: Option<String>,
}

/// Validated movie fields ready to be inserted or written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovie {
    pub title: String,
    pub release_date: NaiveDate,
}

/// Distinguishes an explicit `null` from an absent field.
///
/// Absent fields deserialize to `None` through `#[serde(default)]`;
/// present fields (including `null`) become `Some(..)`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ============================================================================
// Actor payloads
// ============================================================================

/// Actor request body for create and update.
#[derive(Debug, Default, Deserialize)]
pub struct ActorPayload {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Option<String>>,

    #[serde(default, deserialize_with = "present")]
    pub age: Option<Option<i32>>,

    #[serde(default, deserialize_with = "present")]
    pub gender: Option<Option<String>>,
}

impl ActorPayload {
    /// Build a new actor from a create body.
    ///
    /// # Errors
    ///
    /// `UnprocessableEntity` if the name is missing or empty, or the age is
    /// missing or not positive.
    pub fn into_new_actor(self) -> Result<NewActor, CastingError> {
        let actor = NewActor {
            name: self.name.flatten().ok_or_else(|| {
                CastingError::UnprocessableEntity("name is required".to_string())
            })?,
            age: self.age.flatten().ok_or_else(|| {
                CastingError::UnprocessableEntity("age is required".to_string())
            })?,
            gender: self.gender.flatten(),
        };
        validate_actor(actor)
    }

    /// Merge an update body over an existing actor.
    ///
    /// Fields absent from the body keep their stored value. `gender: null`
    /// clears the gender; `null` for name or age is rejected.
    ///
    /// # Errors
    ///
    /// `UnprocessableEntity` if the merged record is invalid.
    pub fn merge_into(self, current: &Actor) -> Result<NewActor, CastingError> {
        let name = match self.name {
            None => current.name.clone(),
            Some(name) => name.ok_or_else(|| {
                CastingError::UnprocessableEntity("name cannot be null".to_string())
            })?,
        };
        let age = match self.age {
            None => current.age,
            Some(age) => age.ok_or_else(|| {
                CastingError::UnprocessableEntity("age cannot be null".to_string())
            })?,
        };
        let gender = match self.gender {
            None => current.gender.clone(),
            Some(gender) => gender,
        };

        validate_actor(NewActor { name, age, gender })
    }
}

fn validate_actor(actor: NewActor) -> Result<NewActor, CastingError> {
    if actor.name.trim().is_empty() {
        return Err(CastingError::UnprocessableEntity(
            "name must not be empty".to_string(),
        ));
    }
    if actor.age <= 0 {
        return Err(CastingError::UnprocessableEntity(
            "age must be positive".to_string(),
        ));
    }
    Ok(actor)
}

// ============================================================================
// Movie payloads
// ============================================================================

/// Movie request body for create and update.
#[derive(Debug, Default, Deserialize)]
pub struct MoviePayload {
    #[serde(default, deserialize_with = "present")]
    pub title: Option<Option<String>>,

    #[serde(default, deserialize_with = "present")]
    pub release_date: Option<Option<String>>,
}

impl MoviePayload {
    /// Build a new movie from a create body.
    ///
    /// # Errors
    ///
    /// `BadRequest` if the title or release date is missing, empty, or the
    /// date cannot be parsed.
    pub fn into_new_movie(self) -> Result<NewMovie, CastingError> {
        let title = self
            .title
            .flatten()
            .ok_or_else(|| CastingError::BadRequest("title is required".to_string()))?;
        let release_date = self
            .release_date
            .flatten()
            .ok_or_else(|| CastingError::BadRequest("release_date is required".to_string()))?;

        validate_movie(title, &release_date)
    }

    /// Merge an update body over an existing movie.
    ///
    /// # Errors
    ///
    /// `BadRequest` if a provided field is null, empty, or unparseable.
    pub fn merge_into(self, current: &Movie) -> Result<NewMovie, CastingError> {
        let title = match self.title {
            None => current.title.clone(),
            Some(title) => {
                title.ok_or_else(|| CastingError::BadRequest("title cannot be null".to_string()))?
            }
        };
        let release_date = match self.release_date {
            None => return validate_title(title, current.release_date),
            Some(date) => date.ok_or_else(|| {
                CastingError::BadRequest("release_date cannot be null".to_string())
            })?,
        };

        validate_movie(title, &release_date)
    }
}

fn validate_movie(title: String, release_date: &str) -> Result<NewMovie, CastingError> {
    let release_date = parse_release_date(release_date).ok_or_else(|| {
        CastingError::BadRequest(format!("unrecognised release_date: {release_date}"))
    })?;
    validate_title(title, release_date)
}

fn validate_title(title: String, release_date: NaiveDate) -> Result<NewMovie, CastingError> {
    if title.trim().is_empty() {
        return Err(CastingError::BadRequest("title must not be empty".to_string()));
    }
    Ok(NewMovie {
        title,
        release_date,
    })
}

/// Parse a release date in `YYYY-MM-DD`, RFC 3339, or RFC 2822 form.
pub fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| DateTime::parse_from_rfc2822(raw).ok().map(|dt| dt.date_naive()))
}

// ============================================================================
// Response bodies
// ============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub success: bool,
    pub health: String,
}

#[derive(Debug, Serialize)]
pub struct ActorListResponse<'a> {
    pub success: bool,
    pub actors: &'a [Actor],
}

#[derive(Debug, Serialize)]
pub struct MovieListResponse<'a> {
    pub success: bool,
    pub movies: &'a [Movie],
}

/// `created` is the new actor id for actors and the title for movies.
#[derive(Debug, Serialize)]
pub struct CreatedResponse<T: Serialize> {
    pub success: bool,
    pub created: T,
}

#[derive(Debug, Serialize)]
pub struct ActorUpdatedResponse {
    pub success: bool,
    pub updated: String,
    pub actor: Vec<Actor>,
}

#[derive(Debug, Serialize)]
pub struct MovieEditedResponse {
    pub success: bool,
    pub edited: i32,
    pub movie: Vec<Movie>,
}

/// `deleted` echoes the id exactly as it appeared in the path.
#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub success: bool,
    pub deleted: String,
}
