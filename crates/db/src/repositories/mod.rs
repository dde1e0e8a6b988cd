//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod audit_log_repo;
pub mod file_lock_repo;
pub mod file_repo;
pub mod metrics_repo;

pub use audit_log_repo::AuditLogRepo;
pub use file_lock_repo::FileLockRepo;
pub use file_repo::FileRepo;
pub use metrics_repo::MetricsRepo;
