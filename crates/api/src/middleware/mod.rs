//! Authentication middleware extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated identity from a JWT
//!   Bearer token.

pub mod auth;
