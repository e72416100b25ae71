//! # Auth Module
//!
//! Bearer token verification at the HTTP boundary. Credentials live with
//! the external identity provider; nothing here stores them.

pub mod errors;
pub mod jwt;
pub mod middleware;

pub use errors::{AuthError, AuthResult};
pub use jwt::{JwtClaims, JwtConfig, JwtManager};
pub use middleware::{require_principal, Authenticator, Principal};
