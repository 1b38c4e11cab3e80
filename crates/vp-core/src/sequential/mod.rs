//! Stateful sequential inference: evidence ledger, odds-ratio updater and
//! the complex-inference workload.

pub mod ledger;
pub mod updater;
pub mod workload;

pub use ledger::{EvidenceLedger, EvidenceRecord};
pub use updater::{ModelSnapshot, ModelState, SequentialUpdater, Transition, UpdateEvent};
pub use workload::{derive_ratio, WorkloadOutcome};
