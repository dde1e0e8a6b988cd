//! filehub domain crate.
//!
//! Zero-internal-dep building blocks shared by the store, event, and API
//! layers: shared id/timestamp aliases, the lock error taxonomy, lock
//! vocabulary and lease constants, the WebSocket message protocol, and
//! audit operation tags.

pub mod audit;
pub mod error;
pub mod locking;
pub mod protocol;
pub mod roles;
pub mod types;
