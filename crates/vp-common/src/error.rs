//! Error types for Visit Predict.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for automation
//! - Remediation suggestions for humans
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Duplicate Evidence
//!   Reason: evidence `proximity` was already submitted
//!   Fix: Submit the item under a new identifier, or reset the model first.
//! ```
//!
//! # Agent-Facing Output
//!
//! ```json
//! {
//!   "code": 30,
//!   "category": "evidence",
//!   "message": "evidence `proximity` was already submitted",
//!   "recoverable": true,
//!   "suggested_action": "resubmit",
//!   "context": { "evidence_id": "proximity" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use vp_math::MathError;

/// Result type alias for Visit Predict operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration file errors (priors, engine settings).
    Config,
    /// Ownership and authorization errors.
    Authorization,
    /// Evidence submission and ledger errors.
    Evidence,
    /// Model state and fixed-point arithmetic errors.
    Model,
    /// State store and audit sink errors.
    Storage,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Authorization => write!(f, "authorization"),
            ErrorCategory::Evidence => write!(f, "evidence"),
            ErrorCategory::Model => write!(f, "model"),
            ErrorCategory::Storage => write!(f, "storage"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Suggested actions for agents to take in response to errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    /// Retry the operation unchanged.
    Retry,
    /// Run the config check command.
    RunCheck,
    /// Resubmit with corrected input.
    Resubmit,
    /// Ask the model owner to perform the call.
    AskOwner,
    /// Initialize the deployment first.
    Initialize,
    /// Manual intervention required.
    ManualIntervention,
}

impl std::fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuggestedAction::Retry => write!(f, "retry"),
            SuggestedAction::RunCheck => write!(f, "run_check"),
            SuggestedAction::Resubmit => write!(f, "resubmit"),
            SuggestedAction::AskOwner => write!(f, "ask_owner"),
            SuggestedAction::Initialize => write!(f, "initialize"),
            SuggestedAction::ManualIntervention => write!(f, "manual_intervention"),
        }
    }
}

/// Unified error type for Visit Predict.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid priors: {0}")]
    InvalidPriors(String),

    #[error("stored model uses scale {stored} but the configured scale is {configured}")]
    ScaleMismatch { stored: u32, configured: u32 },

    // Authorization errors (20-29)
    #[error("caller `{caller}` is not the model owner")]
    Unauthorized { caller: String },

    #[error("engine has not been initialized with an owner")]
    NotInitialized,

    #[error("engine is already initialized (owner `{owner}`)")]
    AlreadyInitialized { owner: String },

    // Evidence errors (30-39)
    #[error("evidence `{id}` was already submitted")]
    DuplicateEvidence { id: String },

    #[error("evidence type {code} is not one of 1..=4")]
    InvalidEvidenceType { code: i64 },

    #[error("evidence index {index} out of range (ledger holds {len})")]
    IndexOutOfRange { index: usize, len: usize },

    // Model errors (40-49)
    #[error("prior {value} exceeds scale {scale}")]
    InvalidPrior { value: u32, scale: u32 },

    #[error("invalid model state: {0}")]
    InvalidState(String),

    #[error("division by zero: {0}")]
    DivisionByZero(String),

    #[error("probability {value} is outside [0, {scale}]")]
    InvalidProbability { value: u128, scale: u32 },

    #[error("complexity overflows at step {step}")]
    ComplexityOverflow { step: u64 },

    // Storage errors (50-59)
    #[error("state store error: {0}")]
    Store(String),

    #[error("audit sink error: {0}")]
    Audit(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<MathError> for Error {
    fn from(err: MathError) -> Self {
        match err {
            MathError::ZeroScale => Error::InvalidPriors(err.to_string()),
            MathError::OutOfRange { value, scale } => Error::InvalidProbability { value, scale },
            MathError::DivisionByZero => Error::DivisionByZero(err.to_string()),
        }
    }
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Authorization errors
    /// - 30-39: Evidence errors
    /// - 40-49: Model errors
    /// - 50-59: Storage errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidPriors(_) => 11,
            Error::ScaleMismatch { .. } => 12,
            Error::Unauthorized { .. } => 20,
            Error::NotInitialized => 21,
            Error::AlreadyInitialized { .. } => 22,
            Error::DuplicateEvidence { .. } => 30,
            Error::InvalidEvidenceType { .. } => 31,
            Error::IndexOutOfRange { .. } => 32,
            Error::InvalidPrior { .. } => 40,
            Error::InvalidState(_) => 41,
            Error::DivisionByZero(_) => 42,
            Error::InvalidProbability { .. } => 43,
            Error::ComplexityOverflow { .. } => 44,
            Error::Store(_) => 50,
            Error::Audit(_) => 51,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidPriors(_) | Error::ScaleMismatch { .. } => {
                ErrorCategory::Config
            }

            Error::Unauthorized { .. } | Error::NotInitialized | Error::AlreadyInitialized { .. } => {
                ErrorCategory::Authorization
            }

            Error::DuplicateEvidence { .. }
            | Error::InvalidEvidenceType { .. }
            | Error::IndexOutOfRange { .. } => ErrorCategory::Evidence,

            Error::InvalidPrior { .. }
            | Error::InvalidState(_)
            | Error::DivisionByZero(_)
            | Error::InvalidProbability { .. }
            | Error::ComplexityOverflow { .. } => ErrorCategory::Model,

            Error::Store(_) | Error::Audit(_) => ErrorCategory::Storage,

            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Whether the caller can reasonably succeed by changing its input or
    /// retrying. Operations never retry internally.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) | Error::InvalidPriors(_) => true,
            Error::ScaleMismatch { .. } => false,

            Error::Unauthorized { .. } => false,
            Error::NotInitialized => true,
            Error::AlreadyInitialized { .. } => false,

            Error::DuplicateEvidence { .. } => true,
            Error::InvalidEvidenceType { .. } => true,
            Error::IndexOutOfRange { .. } => true,

            Error::InvalidPrior { .. } => true,
            Error::InvalidState(_) => false,
            Error::DivisionByZero(_) => false,
            Error::InvalidProbability { .. } => true,
            Error::ComplexityOverflow { .. } => true,

            Error::Store(_) | Error::Audit(_) => true,
            Error::Io(_) => true,
            Error::Json(_) => false,
        }
    }

    /// Returns the suggested action for agents.
    pub fn suggested_action(&self) -> SuggestedAction {
        match self {
            Error::Config(_) | Error::InvalidPriors(_) => SuggestedAction::RunCheck,
            Error::ScaleMismatch { .. } => SuggestedAction::ManualIntervention,

            Error::Unauthorized { .. } => SuggestedAction::AskOwner,
            Error::NotInitialized => SuggestedAction::Initialize,
            Error::AlreadyInitialized { .. } => SuggestedAction::ManualIntervention,

            Error::DuplicateEvidence { .. }
            | Error::InvalidEvidenceType { .. }
            | Error::IndexOutOfRange { .. }
            | Error::InvalidPrior { .. }
            | Error::InvalidProbability { .. } => SuggestedAction::Resubmit,

            Error::ComplexityOverflow { .. } => SuggestedAction::AskOwner,
            Error::InvalidState(_) | Error::DivisionByZero(_) => SuggestedAction::RunCheck,

            Error::Store(_) | Error::Audit(_) | Error::Io(_) => SuggestedAction::Retry,
            Error::Json(_) => SuggestedAction::ManualIntervention,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => "Run 'vp-core check' to validate configuration files.",
            Error::InvalidPriors(_) => {
                "Run 'vp-core check' and fix priors.json; class priors and each proximity distribution must sum to the scale."
            }
            Error::ScaleMismatch { .. } => {
                "Restore the priors scale the model was built with, or have the owner reset the model."
            }

            Error::Unauthorized { .. } => {
                "This operation is restricted to the model owner. Run 'vp-core owner' to see who holds it."
            }
            Error::NotInitialized => "Initialize the deployment with 'vp-core init --owner <principal>'.",
            Error::AlreadyInitialized { .. } => {
                "The deployment already has an owner. Use 'vp-core transfer-owner' as the current owner instead."
            }

            Error::DuplicateEvidence { .. } => {
                "Submit the item under a new identifier, or have the owner reset the model first."
            }
            Error::InvalidEvidenceType { .. } => {
                "Use 1 (proximity), 2 (confirmation), 3 (device data) or 4 (prescription)."
            }
            Error::IndexOutOfRange { .. } => {
                "Query 'vp-core state' for the evidence count; indices start at 0."
            }

            Error::InvalidPrior { .. } => "Choose a prior between 0 and the configured scale.",
            Error::InvalidState(_) => {
                "Every class assigns zero probability to this evidence. Review the conditional probability tables."
            }
            Error::DivisionByZero(_) => {
                "A normalizing constant was zero. Review the conditional probability tables."
            }
            Error::InvalidProbability { .. } => "Probabilities must lie between 0 and the configured scale.",
            Error::ComplexityOverflow { .. } => {
                "The model has taken too many steps for the configured overflow policy. Reset the model or switch to 'saturate'."
            }

            Error::Store(_) => "Check that the data directory is writable, then retry.",
            Error::Audit(_) => "Check that the audit log is writable; run 'vp-core audit verify' for integrity.",

            Error::Io(_) => "Check disk space and permissions, then retry the operation.",
            Error::Json(_) => "A stored file holds invalid JSON. Restore it from backup or remove it.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidPriors(_) => "Invalid Priors Configuration",
            Error::ScaleMismatch { .. } => "Scale Mismatch",
            Error::Unauthorized { .. } => "Unauthorized",
            Error::NotInitialized => "Not Initialized",
            Error::AlreadyInitialized { .. } => "Already Initialized",
            Error::DuplicateEvidence { .. } => "Duplicate Evidence",
            Error::InvalidEvidenceType { .. } => "Invalid Evidence Type",
            Error::IndexOutOfRange { .. } => "Index Out Of Range",
            Error::InvalidPrior { .. } => "Invalid Prior",
            Error::InvalidState(_) => "Invalid Model State",
            Error::DivisionByZero(_) => "Division By Zero",
            Error::InvalidProbability { .. } => "Invalid Probability",
            Error::ComplexityOverflow { .. } => "Complexity Overflow",
            Error::Store(_) => "State Store Error",
            Error::Audit(_) => "Audit Sink Error",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,
    /// Error category for grouping.
    pub category: ErrorCategory,
    /// Human-readable error message.
    pub message: String,
    /// Whether the error is potentially recoverable.
    pub recoverable: bool,
    /// Suggested action for agents.
    pub suggested_action: SuggestedAction,
    /// Additional structured context (e.g., evidence id, index).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::Unauthorized { caller } => {
                context.insert("caller".to_string(), serde_json::json!(caller));
            }
            Error::AlreadyInitialized { owner } => {
                context.insert("owner".to_string(), serde_json::json!(owner));
            }
            Error::DuplicateEvidence { id } => {
                context.insert("evidence_id".to_string(), serde_json::json!(id));
            }
            Error::InvalidEvidenceType { code } => {
                context.insert("evidence_type".to_string(), serde_json::json!(code));
            }
            Error::IndexOutOfRange { index, len } => {
                context.insert("index".to_string(), serde_json::json!(index));
                context.insert("len".to_string(), serde_json::json!(len));
            }
            Error::InvalidPrior { value, scale } => {
                context.insert("prior".to_string(), serde_json::json!(value));
                context.insert("scale".to_string(), serde_json::json!(scale));
            }
            Error::ComplexityOverflow { step } => {
                context.insert("step".to_string(), serde_json::json!(step));
            }
            Error::ScaleMismatch { stored, configured } => {
                context.insert("stored_scale".to_string(), serde_json::json!(stored));
                context.insert("configured_scale".to_string(), serde_json::json!(configured));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action(),
            context,
        }
    }
}

impl StructuredError {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }

    /// Serialize to pretty JSON string.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.to_json())
    }
}

/// Format an error for human-readable stderr output.
///
/// Output format:
/// ```text
/// ✗ [Headline]
///   Reason: [Error message]
///   Fix: [Remediation hint]
/// ```
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}
