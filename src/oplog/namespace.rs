//! Namespaces and reserved administrative names
//!
//! Per OPLOG_MODEL.md:
//! - Every oplog entry targets a namespace (database + collection)
//! - Commands target the `$cmd` pseudo-collection of their database
//! - A small set of reserved namespaces carries catalog/metadata state
//!   and must never be batched with ordinary writes (see APPLY_BATCHING.md)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Database reserved for server administration.
pub const ADMIN_DB: &str = "admin";

/// Pseudo-collection that command entries target.
pub const COMMAND_COLLECTION: &str = "$cmd";

/// Per-database collection holding view definitions.
pub const SYSTEM_VIEWS_COLLECTION: &str = "system.views";

/// Database of the server-configuration document.
pub const SERVER_CONFIGURATION_DB: &str = "admin";

/// Collection of the server-configuration document.
pub const SERVER_CONFIGURATION_COLLECTION: &str = "system.version";

/// The target of one oplog entry: a database plus a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Namespace {
    db: String,
    coll: String,
}

impl Namespace {
    /// Create a namespace from database and collection names.
    pub fn new(db: impl Into<String>, coll: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            coll: coll.into(),
        }
    }

    /// The command pseudo-namespace of a database (`<db>.$cmd`).
    pub fn command(db: impl Into<String>) -> Self {
        Self::new(db, COMMAND_COLLECTION)
    }

    /// The command pseudo-namespace of the admin database.
    pub fn admin_command() -> Self {
        Self::command(ADMIN_DB)
    }

    /// The reserved server-configuration namespace.
    pub fn server_configuration() -> Self {
        Self::new(SERVER_CONFIGURATION_DB, SERVER_CONFIGURATION_COLLECTION)
    }

    /// Database name.
    pub fn db(&self) -> &str {
        &self.db
    }

    /// Collection name.
    pub fn coll(&self) -> &str {
        &self.coll
    }

    /// Full `db.coll` form.
    pub fn full(&self) -> String {
        format!("{}.{}", self.db, self.coll)
    }

    /// Whether this is a command pseudo-namespace.
    pub fn is_command(&self) -> bool {
        self.coll == COMMAND_COLLECTION
    }

    /// Whether this namespace is a view catalog (`<db>.system.views`).
    ///
    /// View-catalog writes invalidate cached catalog state and must be
    /// applied in strict isolation.
    pub fn is_system_dot_views(&self) -> bool {
        self.coll == SYSTEM_VIEWS_COLLECTION
    }

    /// Whether this is the reserved server-configuration namespace.
    pub fn is_server_configuration(&self) -> bool {
        self.db == SERVER_CONFIGURATION_DB && self.coll == SERVER_CONFIGURATION_COLLECTION
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.db, self.coll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_form() {
        let ns = Namespace::new("test", "foo");
        assert_eq!(ns.full(), "test.foo");
        assert_eq!(ns.to_string(), "test.foo");
    }

    #[test]
    fn test_command_namespace() {
        let ns = Namespace::command("test");
        assert_eq!(ns.full(), "test.$cmd");
        assert!(ns.is_command());

        let admin = Namespace::admin_command();
        assert_eq!(admin.full(), "admin.$cmd");
    }

    #[test]
    fn test_system_dot_views_in_any_database() {
        assert!(Namespace::new("test", SYSTEM_VIEWS_COLLECTION).is_system_dot_views());
        assert!(Namespace::new("other", SYSTEM_VIEWS_COLLECTION).is_system_dot_views());
        assert!(!Namespace::new("test", "views").is_system_dot_views());
    }

    #[test]
    fn test_server_configuration_is_admin_only() {
        assert!(Namespace::server_configuration().is_server_configuration());
        assert!(Namespace::new("admin", "system.version").is_server_configuration());
        // Same collection name outside admin is an ordinary namespace.
        assert!(!Namespace::new("test", "system.version").is_server_configuration());
    }

    #[test]
    fn test_ordinary_namespace_has_no_reserved_classification() {
        let ns = Namespace::new("test", "bar");
        assert!(!ns.is_command());
        assert!(!ns.is_system_dot_views());
        assert!(!ns.is_server_configuration());
    }
}
