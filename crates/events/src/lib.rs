//! filehub event bus and audit sink.
//!
//! - [`EventBus`] — in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`HubEvent`] — the canonical event envelope published by the lock
//!   coordinator and the file handlers.
//! - [`AuditPersistence`] — background service that appends an audit
//!   record for every successful lock mutation and content edit.

pub mod bus;
pub mod persistence;

pub use bus::{EventBus, HubEvent};
pub use persistence::AuditPersistence;
