//! Stable event names, pipeline stages and correlation context.
//!
//! Event names are part of the JSONL log contract; renaming one is a
//! breaking change for log consumers.

use serde::{Deserialize, Serialize};

/// Where in the engine an event originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup, configuration and ownership bootstrap.
    Init,
    /// Batch classification.
    Infer,
    /// Sequential evidence updates and resets.
    Update,
    /// Ownership checks and transfers.
    Access,
    /// State persistence and audit publication.
    Persist,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Infer => "infer",
            Stage::Update => "update",
            Stage::Access => "access",
            Stage::Persist => "persist",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    // Config
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";
    pub const CONFIG_ERROR: &str = "config.error";

    // Inference
    pub const INFER_CLASSIFIED: &str = "infer.classified";
    pub const INFER_REJECTED: &str = "infer.rejected";

    // Sequential updates
    pub const UPDATE_POSTERIOR: &str = "update.posterior";
    pub const UPDATE_REJECTED: &str = "update.rejected";
    pub const UPDATE_WORKLOAD: &str = "update.workload";
    pub const MODEL_RESET: &str = "model.reset";

    // Access
    pub const ACCESS_DENIED: &str = "access.denied";
    pub const ACCESS_TRANSFERRED: &str = "access.transferred";
    pub const ACCESS_INITIALIZED: &str = "access.initialized";

    // Persistence
    pub const STATE_LOCKED: &str = "state.locked";
    pub const STATE_SAVED: &str = "state.saved";
    pub const AUDIT_PUBLISHED: &str = "audit.published";
    pub const AUDIT_ROLLBACK: &str = "audit.rollback";
    pub const AUDIT_ROLLBACK_FAILED: &str = "audit.rollback_failed";

    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// Correlation IDs attached to every event emitted through `log_event!`.
#[derive(Debug, Clone)]
pub struct LogContext {
    /// Unique ID for this invocation.
    pub run_id: String,
    pub host_id: String,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>, host_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
            host_id: host_id.into(),
        }
    }
}
