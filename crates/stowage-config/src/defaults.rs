//! Fixed keys and allow-lists shared by the parser and the resolver.
//!
//! # Design
//! - Centralize settings-tree key names so parsing and diagnostics agree.
//! - Keep the override allow-list in one place for auditability.

/// Top-level key holding the consolidated object-store block.
pub(crate) const CONSOLIDATED_SECTION: &str = "object_store";
/// Key under the consolidated block holding per-type overrides.
pub(crate) const OBJECTS_KEY: &str = "objects";
/// Override keys a consolidated per-type block may set.
pub const ALLOWED_OBJECT_STORE_OVERRIDES: [&str; 4] = ["bucket", "enabled", "proxy_download", "cdn"];
/// Output keys only the consolidated path may set; dropped from legacy extras.
pub(crate) const RESERVED_RESOLVED_KEYS: [&str; 2] = ["consolidated_settings", "cdn"];
