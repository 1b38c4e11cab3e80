//! Configuration snapshots for reproducibility.
//!
//! A snapshot pins the exact priors and engine settings a command ran with,
//! so a decision in the audit log can be traced back to its tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::resolve::{ConfigPaths, ConfigSource};
use crate::{EngineSettings, Priors};

/// A frozen snapshot of configuration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub timestamp: DateTime<Utc>,

    pub schema_version: String,

    /// SHA-256 hash of the priors JSON content.
    #[serde(default)]
    pub priors_hash: Option<String>,

    #[serde(default)]
    pub priors_path: Option<String>,

    pub priors_source: String,

    /// SHA-256 hash of the engine JSON content.
    #[serde(default)]
    pub engine_hash: Option<String>,

    #[serde(default)]
    pub engine_path: Option<String>,

    pub engine_source: String,

    /// Combined hash of all config files (for quick comparison).
    pub combined_hash: String,

    pub summary: ConfigSummary,
}

/// Key configuration values for quick reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub scale: u32,
    pub prior_pph: u32,
    pub prior_ppr: u32,
    pub tenancy: String,
    pub complexity_overflow: String,
    pub max_workload_iterations: u64,
}

impl ConfigSnapshot {
    /// Create a new snapshot from loaded configuration.
    pub fn new(
        priors: &Priors,
        engine: &EngineSettings,
        paths: &ConfigPaths,
        priors_json: Option<&str>,
        engine_json: Option<&str>,
    ) -> Self {
        let priors_hash = priors_json.map(hash_content);
        let engine_hash = engine_json.map(hash_content);

        let combined = format!(
            "{}:{}",
            priors_hash.as_deref().unwrap_or("none"),
            engine_hash.as_deref().unwrap_or("none")
        );

        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            priors_hash,
            priors_path: paths.priors.as_ref().map(|p| p.display().to_string()),
            priors_source: paths.priors_source.to_string(),
            engine_hash,
            engine_path: paths.engine.as_ref().map(|p| p.display().to_string()),
            engine_source: paths.engine_source.to_string(),
            combined_hash: hash_content(&combined),
            summary: ConfigSummary::from_config(priors, engine),
        }
    }

    /// Create a snapshot with only defaults (no config files loaded).
    pub fn defaults_only() -> Self {
        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            priors_hash: None,
            priors_path: None,
            priors_source: ConfigSource::BuiltinDefault.to_string(),
            engine_hash: None,
            engine_path: None,
            engine_source: ConfigSource::BuiltinDefault.to_string(),
            combined_hash: hash_content("none:none"),
            summary: ConfigSummary::from_config(&Priors::default(), &EngineSettings::default()),
        }
    }

    pub fn matches(&self, other: &ConfigSnapshot) -> bool {
        self.combined_hash == other.combined_hash
    }

    /// Get a short identifier for this snapshot (first 12 chars of hash).
    pub fn short_id(&self) -> &str {
        &self.combined_hash[..12.min(self.combined_hash.len())]
    }
}

impl ConfigSummary {
    fn from_config(priors: &Priors, engine: &EngineSettings) -> Self {
        ConfigSummary {
            scale: priors.scale,
            prior_pph: priors.classes.pph.prior,
            prior_ppr: priors.classes.ppr.prior,
            tenancy: engine.tenancy.to_string(),
            complexity_overflow: engine.complexity_overflow.to_string(),
            max_workload_iterations: engine.max_workload_iterations,
        }
    }
}

/// Hash content with SHA-256 and return hex string.
fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_snapshot() {
        let snapshot = ConfigSnapshot::defaults_only();
        assert_eq!(snapshot.schema_version, crate::CONFIG_SCHEMA_VERSION);
        assert!(snapshot.priors_hash.is_none());
        assert_eq!(snapshot.summary.scale, 100);
        assert_eq!(snapshot.summary.tenancy, "global");
    }

    #[test]
    fn test_snapshot_short_id() {
        let snapshot = ConfigSnapshot::defaults_only();
        assert_eq!(snapshot.short_id().len(), 12);
    }

    #[test]
    fn test_content_changes_hash() {
        let paths = ConfigPaths::default();
        let a = ConfigSnapshot::new(
            &Priors::default(),
            &EngineSettings::default(),
            &paths,
            Some("{\"a\":1}"),
            None,
        );
        let b = ConfigSnapshot::new(
            &Priors::default(),
            &EngineSettings::default(),
            &paths,
            Some("{\"a\":2}"),
            None,
        );
        assert!(!a.matches(&b));
        assert!(a.matches(&a.clone()));
    }

    #[test]
    fn test_hash_content() {
        let hash = hash_content("test");
        assert_eq!(hash, hash_content("test"));
        assert_eq!(hash.len(), 64);
    }
}
