//! Visit Predict configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for priors.json and engine.json
//! - Config resolution (CLI → env → XDG → system → defaults)
//! - Semantic validation
//! - Config snapshots for audit trails

pub mod engine;
pub mod priors;
pub mod resolve;
pub mod snapshot;
pub mod validate;

pub use engine::{EngineSettings, OverflowPolicy, Tenancy};
pub use priors::Priors;
pub use resolve::{resolve_config, ConfigPaths, ConfigSource};
pub use snapshot::ConfigSnapshot;
pub use validate::{ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
