//! Middleware for the casting service.
//!
//! # Components
//!
//! - `auth` - Token verification and permission gate for resource routes
//! - `http_metrics` - HTTP request metrics middleware

pub mod auth;
pub mod http_metrics;

pub use auth::{require_permission, PermissionGate};
pub use http_metrics::http_metrics_middleware;
