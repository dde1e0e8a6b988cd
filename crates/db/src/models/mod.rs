//! Domain model structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row, plus the create/query DTOs its repository needs.

pub mod audit;
pub mod file;
pub mod file_lock;
pub mod metrics;
