//! Engine settings: tenancy, complexity overflow policy, workload cap.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default cap on hash-chain iterations for the workload simulator.
pub const DEFAULT_MAX_WORKLOAD_ITERATIONS: u64 = 100;

/// How model state is partitioned between callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Tenancy {
    /// One model shared by every caller.
    #[default]
    Global,
    /// One model per caller principal.
    PerCaller,
}

/// What happens when `2^step` no longer fits in 64 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Cap the complexity metric at `u64::MAX`.
    #[default]
    Saturate,
    /// Refuse the submission with a complexity overflow error.
    Reject,
}

impl std::fmt::Display for Tenancy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tenancy::Global => write!(f, "global"),
            Tenancy::PerCaller => write!(f, "per_caller"),
        }
    }
}

impl std::fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverflowPolicy::Saturate => write!(f, "saturate"),
            OverflowPolicy::Reject => write!(f, "reject"),
        }
    }
}

/// Complete engine.json configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EngineSettings {
    pub schema_version: String,

    #[serde(default)]
    pub tenancy: Tenancy,

    #[serde(default)]
    pub complexity_overflow: OverflowPolicy,

    /// Upper bound on hash-chain rounds in complex inference.
    #[serde(default = "default_max_workload_iterations")]
    pub max_workload_iterations: u64,
}

fn default_max_workload_iterations() -> u64 {
    DEFAULT_MAX_WORKLOAD_ITERATIONS
}

impl EngineSettings {
    /// Load engine settings from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, crate::validate::ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::validate::ValidationError::IoError(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, crate::validate::ValidationError> {
        serde_json::from_str(json).map_err(|e| {
            crate::validate::ValidationError::ParseError(format!("Invalid JSON: {}", e))
        })
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            tenancy: Tenancy::default(),
            complexity_overflow: OverflowPolicy::default(),
            max_workload_iterations: DEFAULT_MAX_WORKLOAD_ITERATIONS,
        }
    }
}
