//! Oplog entry type
//!
//! Per OPLOG_MODEL.md:
//! - An entry is an immutable record of one committed write
//! - The document body is schema-flexible and opaque to batching
//! - The fields batching inspects (op type, namespace, prepared/apply-ops/
//!   commit flags, approximate size) are projected once at construction
//!   and never recomputed

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::namespace::Namespace;
use super::optime::OpTime;

/// Fixed per-entry envelope overhead counted against byte limits,
/// in addition to the serialized payload.
const ENTRY_OVERHEAD_BYTES: usize = 110;

/// Kind of logged write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpType {
    /// Insertion of a new document
    Insert,
    /// Replacement or modification of an existing document
    Update,
    /// Deletion of a document
    Delete,
    /// Administrative or transactional command
    Command,
}

impl OpType {
    /// String form for observability.
    pub fn as_str(&self) -> &'static str {
        match self {
            OpType::Insert => "insert",
            OpType::Update => "update",
            OpType::Delete => "delete",
            OpType::Command => "command",
        }
    }

    /// Whether this is an ordinary CRUD write.
    pub fn is_crud(&self) -> bool {
        !matches!(self, OpType::Command)
    }
}

/// One logged write operation.
///
/// Immutable after construction. Batching decisions read only the typed
/// projection; the payload is carried through to the apply strategy
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OplogEntry {
    op_time: OpTime,
    op_type: OpType,
    namespace: Namespace,
    wall_time: DateTime<Utc>,
    payload: Value,
    // Batching projection, derived from op_type + payload at construction.
    is_command_apply_batch: bool,
    is_prepared: bool,
    is_commit_transaction: bool,
    approximate_size: usize,
}

impl OplogEntry {
    fn new(op_time: OpTime, op_type: OpType, namespace: Namespace, payload: Value) -> Self {
        let (is_command_apply_batch, is_commit_transaction, is_prepared) =
            project_command_flags(op_type, &payload);
        let approximate_size = approximate_payload_size(&payload) + ENTRY_OVERHEAD_BYTES;
        Self {
            op_time,
            op_type,
            namespace,
            wall_time: Utc::now(),
            payload,
            is_command_apply_batch,
            is_prepared,
            is_commit_transaction,
            approximate_size,
        }
    }

    /// Create an insert entry.
    pub fn insert(op_time: OpTime, namespace: Namespace, payload: Value) -> Self {
        Self::new(op_time, OpType::Insert, namespace, payload)
    }

    /// Create an update entry.
    pub fn update(op_time: OpTime, namespace: Namespace, payload: Value) -> Self {
        Self::new(op_time, OpType::Update, namespace, payload)
    }

    /// Create a delete entry.
    pub fn delete(op_time: OpTime, namespace: Namespace, payload: Value) -> Self {
        Self::new(op_time, OpType::Delete, namespace, payload)
    }

    /// Create a grouped multi-operation command entry (`applyOps`).
    ///
    /// When `prepared` is true the entry belongs to a two-phase transaction
    /// that was staged earlier; APPLY_BATCHING.md requires such entries to
    /// be applied in their own batch.
    pub fn apply_ops(op_time: OpTime, db: impl Into<String>, prepared: bool, ops: Value) -> Self {
        let mut payload = serde_json::json!({ "applyOps": ops });
        if prepared {
            payload["prepare"] = Value::Bool(true);
        }
        Self::new(op_time, OpType::Command, Namespace::command(db), payload)
    }

    /// Create a commit entry for a transaction.
    ///
    /// `prepared` distinguishes the commit of a two-phase (prepared)
    /// transaction from the commit of a transaction that was never split
    /// across a prepare step.
    pub fn commit_transaction(op_time: OpTime, db: impl Into<String>, prepared: bool) -> Self {
        let payload = serde_json::json!({
            "commitTransaction": 1,
            "prepared": prepared,
        });
        Self::new(op_time, OpType::Command, Namespace::command(db), payload)
    }

    /// Override the wall-clock time recorded for this entry.
    pub fn with_wall_time(mut self, wall_time: DateTime<Utc>) -> Self {
        self.wall_time = wall_time;
        self
    }

    /// Log position.
    pub fn op_time(&self) -> OpTime {
        self.op_time
    }

    /// Kind of write.
    pub fn op_type(&self) -> OpType {
        self.op_type
    }

    /// Target namespace.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Wall-clock time the operation was logged.
    pub fn wall_time(&self) -> DateTime<Utc> {
        self.wall_time
    }

    /// Opaque document body.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Whether this entry is a grouped multi-operation command unit.
    pub fn is_command_apply_batch(&self) -> bool {
        self.is_command_apply_batch
    }

    /// Whether this entry is part of (or commits) a prepared transaction.
    pub fn is_prepared(&self) -> bool {
        self.is_prepared
    }

    /// Whether this entry finalizes a transaction.
    pub fn is_commit_transaction(&self) -> bool {
        self.is_commit_transaction
    }

    /// Serialized size counted against batch byte limits.
    pub fn approximate_size(&self) -> usize {
        self.approximate_size
    }
}

/// Derive the batching flags from a command payload.
///
/// Non-command entries carry no flags. Command entries are classified by
/// payload key: `applyOps` marks a grouped command unit, `commitTransaction`
/// marks a transaction commit, and `prepare`/`prepared` mark two-phase
/// participation.
fn project_command_flags(op_type: OpType, payload: &Value) -> (bool, bool, bool) {
    if op_type != OpType::Command {
        return (false, false, false);
    }
    let is_apply_ops = payload.get("applyOps").is_some();
    let is_commit = payload.get("commitTransaction").is_some();
    let is_prepared = payload
        .get("prepare")
        .or_else(|| payload.get("prepared"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    (is_apply_ops, is_commit, is_prepared)
}

fn approximate_payload_size(payload: &Value) -> usize {
    serde_json::to_vec(payload).map_or(0, |bytes| bytes.len())
}
