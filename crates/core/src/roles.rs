//! Role name constants used by authorization checks.

/// Administrators may force-release any lock and read the audit trail.
pub const ROLE_ADMIN: &str = "admin";

/// Regular collaborators.
pub const ROLE_USER: &str = "user";
