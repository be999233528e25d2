//! Casting Agency Service Library
//!
//! REST backend for a casting agency: actors and movies stored in
//! PostgreSQL, with role-based access enforced from identity provider
//! access tokens.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs (permission gate) -> handlers/*.rs -> repositories/*.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - JWKS client, JWT validation, claims, permission names
//! - `config` - Service configuration from environment
//! - `errors` - Error type and the JSON error envelope
//! - `extract` - Optional JSON body extractor
//! - `handlers` - HTTP request handlers
//! - `middleware` - Permission gate and HTTP metrics
//! - `models` - Records, payloads, response bodies
//! - `observability` - Metrics definitions
//! - `pagination` - Page window selection
//! - `repositories` - `CastingStore` trait with Postgres and in-memory stores
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod pagination;
pub mod repositories;
pub mod routes;
