//! HTTP request handlers, grouped by resource.

pub mod admin;
pub mod files;
pub mod locks;
pub mod partitions;
