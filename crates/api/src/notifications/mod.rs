//! Event-to-WebSocket broadcast routing.
//!
//! - [`router::BroadcastRouter`] -- subscribes to the event bus and pushes
//!   refreshed lock-table, allocation, topology, and metrics snapshots to
//!   connected clients.

pub mod router;

pub use router::BroadcastRouter;
