//! Visit Predict common types, IDs, and errors.
//!
//! This crate provides foundational types shared across vp-core modules:
//! - Principal and run identity types
//! - Visit classes
//! - The unified error taxonomy with stable codes
//! - Output format selection

pub mod class;
pub mod error;
pub mod id;
pub mod output;

pub use class::VisitClass;
pub use error::{Error, ErrorCategory, Result, StructuredError, SuggestedAction};
pub use id::{Principal, RunId};
pub use output::OutputFormat;

/// Schema version for JSON payloads emitted by the engine.
pub const SCHEMA_VERSION: &str = "1.0.0";
