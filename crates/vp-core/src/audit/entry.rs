//! Audit entry types.

use crate::inference::InferenceTrace;
use crate::sequential::EvidenceRecord;
use crate::store::StateKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use vp_common::{Principal, VisitClass};
use vp_math::Probability;

/// Schema version for audit log entries.
pub const AUDIT_SCHEMA_VERSION: &str = "1.0.0";

/// What happened. One variant per externally visible event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditRecord {
    /// Full classification trace: priors, per-channel factors, result.
    InferenceTrace { trace: Box<InferenceTrace> },
    /// Compact classification outcome.
    Decision {
        predicted: VisitClass,
        posterior: Probability,
    },
    StepAdvanced {
        key: StateKey,
        step: u64,
        evidence: EvidenceRecord,
    },
    PosteriorUpdated {
        key: StateKey,
        step: u64,
        posterior: Probability,
        complexity: u64,
    },
    ModelReset {
        key: StateKey,
        prior: Probability,
    },
    OwnerInitialized {
        owner: Principal,
    },
    OwnershipTransferred {
        from: Principal,
        to: Principal,
    },
}

impl AuditRecord {
    pub fn kind(&self) -> &'static str {
        match self {
            AuditRecord::InferenceTrace { .. } => "inference_trace",
            AuditRecord::Decision { .. } => "decision",
            AuditRecord::StepAdvanced { .. } => "step_advanced",
            AuditRecord::PosteriorUpdated { .. } => "posterior_updated",
            AuditRecord::ModelReset { .. } => "model_reset",
            AuditRecord::OwnerInitialized { .. } => "owner_initialized",
            AuditRecord::OwnershipTransferred { .. } => "ownership_transferred",
        }
    }
}

/// A single audit log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub schema_version: String,

    /// Position in the log, starting at 1. Zero until the entry is chained.
    pub seq: u64,

    /// Invocation timestamp supplied by the host.
    pub ts: DateTime<Utc>,

    pub caller: Principal,

    pub record: AuditRecord,

    /// Hash of the previous entry, or "genesis" for the first.
    pub prev_hash: String,

    /// SHA-256 over the entry serialized with this field unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_hash: Option<String>,
}

impl AuditEntry {
    /// Unchained entry; the sink assigns `seq` and the hashes.
    pub fn new(caller: &Principal, ts: DateTime<Utc>, record: AuditRecord) -> Self {
        AuditEntry {
            schema_version: AUDIT_SCHEMA_VERSION.to_string(),
            seq: 0,
            ts,
            caller: caller.clone(),
            record,
            prev_hash: String::new(),
            entry_hash: None,
        }
    }

    /// Hash of the entry as if `entry_hash` were unset.
    pub fn digest(&self) -> String {
        let mut unhashed = self.clone();
        unhashed.entry_hash = None;
        let json = serde_json::to_string(&unhashed).unwrap_or_default();
        hex::encode(Sha256::digest(json.as_bytes()))
    }

    pub fn compute_hash(&mut self) {
        self.entry_hash = Some(self.digest());
    }

    pub fn verify_hash(&self) -> bool {
        match &self.entry_hash {
            Some(stored) => *stored == self.digest(),
            None => false,
        }
    }

    /// Entry hash for chaining.
    pub fn hash(&self) -> &str {
        self.entry_hash.as_deref().unwrap_or("invalid")
    }
}
