//! Oplog value types
//!
//! Per OPLOG_MODEL.md:
//! - An oplog entry is an immutable record of one committed write
//! - Entries are totally ordered by log position
//! - Replicas apply entries in exactly position order

mod entry;
mod namespace;
mod optime;

pub use entry::{OpType, OplogEntry};
pub use namespace::{
    Namespace, ADMIN_DB, COMMAND_COLLECTION, SERVER_CONFIGURATION_COLLECTION,
    SERVER_CONFIGURATION_DB, SYSTEM_VIEWS_COLLECTION,
};
pub use optime::OpTime;
