//! # Casting Test Utilities
//!
//! Shared test utilities for the casting service.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (Ed25519 and RSA signing keys with their JWKs)
//! - Token builders (TestTokenBuilder, Role presets)
//! - Server test harness (TestCastingServer for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use casting_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let server = TestCastingServer::spawn().await?;
//!
//!     let expired = server
//!         .token_builder()
//!         .with_role(Role::CastingAssistant)
//!         .expires_in(-600)
//!         .sign(server.ed25519_key());
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use token_builders::*;
