//! filehub API server library.
//!
//! Exposes the building blocks (config, state, error handling, the lock
//! coordinator, routes, WebSocket infrastructure) so integration tests and
//! the binary entrypoint can both access them.

pub mod auth;
pub mod background;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod notifications;
pub mod partitions;
pub mod response;
pub mod routes;
pub mod state;
pub mod ws;
