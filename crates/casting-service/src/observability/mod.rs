//! Observability for the casting service.
//!
//! Provides metrics definitions and recording helpers.

pub mod metrics;
