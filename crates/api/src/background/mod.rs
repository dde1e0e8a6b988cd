//! Background tasks.
//!
//! - [`lock_sweeper`] -- removes lock records whose lease has lapsed.
//! - [`metrics_sampler`] -- periodically records and publishes aggregate
//!   server metrics.

pub mod lock_sweeper;
pub mod metrics_sampler;
