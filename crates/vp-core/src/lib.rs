//! Visit Predict Core Library
//!
//! Fixed-point Bayesian classification of physician visits as in-person
//! (PPH) or remote (PPR):
//! - Batch naive-Bayes classification with a full inference trace
//! - Sequential odds-ratio updates over a deduplicated evidence ledger
//! - Single-owner access control for protected operations
//! - Keyed state persistence and a hash-chained audit trail
//!
//! The binary entry point is in `main.rs`.

pub mod access;
pub mod audit;
pub mod config;
pub mod engine;
pub mod evidence;
pub mod exit_codes;
pub mod inference;
pub mod lock;
pub mod logging;
pub mod schema;
pub mod sequential;
pub mod store;

pub use engine::{Engine, InvocationContext};
pub use evidence::{EvidenceChannel, EvidenceVector, Proximity};
