//! Permission strings granted by the identity provider.

pub const GET_ACTORS: &str = "get:actors";
pub const CREATE_ACTORS: &str = "create:actors";
pub const UPDATE_ACTORS: &str = "update:actors";
pub const DELETE_ACTORS: &str = "delete:actors";

pub const GET_MOVIES: &str = "get:movies";
pub const CREATE_MOVIES: &str = "create:movies";
pub const UPDATE_MOVIES: &str = "update:movies";
pub const DELETE_MOVIES: &str = "delete:movies";

/// Every permission the service checks.
pub const ALL: [&str; 8] = [
    GET_ACTORS,
    CREATE_ACTORS,
    UPDATE_ACTORS,
    DELETE_ACTORS,
    GET_MOVIES,
    CREATE_MOVIES,
    UPDATE_MOVIES,
    DELETE_MOVIES,
];
