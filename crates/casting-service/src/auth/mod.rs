//! Token verification for the casting service.
//!
//! Access tokens are issued by an external identity provider and verified
//! here against its published JWKS.

pub mod claims;
pub mod jwks;
pub mod jwt;
pub mod permissions;

pub use claims::Claims;
pub use jwks::JwksClient;
pub use jwt::JwtValidator;
