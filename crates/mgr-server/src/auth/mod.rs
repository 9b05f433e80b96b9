//! Ingress authentication: JWT verification, the request auth middleware,
//! and federation-caller validation.

pub mod jwt;
pub mod middleware;

pub use jwt::{AuthVerifier, VerifiedClaims};
