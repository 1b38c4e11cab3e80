//! Append-only audit trail with hash-chain integrity.
//!
//! Every committed engine operation publishes one batch of [`AuditRecord`]s
//! through an [`AuditSink`]. The JSONL sink chains entries:
//!
//! - **Format**: JSON Lines, one entry per line
//! - **Chain**: each entry carries `seq`, `prev_hash` and its own `entry_hash`
//! - **Batches**: a batch lands completely or not at all
//! - **Verification**: [`verify_log`] re-walks the chain
//!
//! Entries are a pure function of the operation inputs: the timestamp and the
//! caller come from the invocation context, never from the clock.
//!
//! # File Location
//!
//! - `$VP_DATA/audit/audit.jsonl` (if VP_DATA is set)
//! - `$XDG_DATA_HOME/visit-predict/audit/audit.jsonl` (otherwise)

mod entry;
mod verify;
mod writer;

pub use entry::{AuditEntry, AuditRecord, AUDIT_SCHEMA_VERSION};
pub use verify::{verify_log, BreakType, BrokenLink, TamperedEntry, VerificationResult};
pub use writer::{AuditSink, HashChain, JsonlAuditLog, MemorySink, GENESIS_HASH};

use crate::store::resolve_data_dir;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("failed to resolve audit log directory (set VP_DATA or XDG_DATA_HOME)")]
    DataDirUnavailable,

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("audit append to {path} failed ({source}) and the file could not be cut back ({truncate}); it may end in a partial batch")]
    PartialBatch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        truncate: std::io::Error,
    },

    #[error("failed to serialize audit entry: {source}")]
    Serialization {
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse audit entry at line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl From<AuditError> for vp_common::Error {
    fn from(err: AuditError) -> Self {
        vp_common::Error::Audit(err.to_string())
    }
}

pub(crate) const AUDIT_DIR_NAME: &str = "audit";
pub(crate) const AUDIT_LOG_FILENAME: &str = "audit.jsonl";

/// Default audit log location under the data directory.
pub fn resolve_audit_path() -> Result<PathBuf, AuditError> {
    let base = resolve_data_dir().map_err(|_| AuditError::DataDirUnavailable)?;
    Ok(audit_path_in(&base))
}

/// Audit log location for an explicit data directory.
pub fn audit_path_in(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join(AUDIT_DIR_NAME).join(AUDIT_LOG_FILENAME)
}
