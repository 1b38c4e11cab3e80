//! JSON Schema generation for configuration and output types.
//!
//! ```bash
//! vp-core schema --list
//! vp-core schema InferenceResult
//! vp-core schema --all
//! ```

use schemars::schema_for;
use serde_json::Value;
use std::collections::BTreeMap;

pub use crate::engine::ComplexInferenceOutcome;
pub use crate::evidence::{EvidenceChannel, EvidenceVector, Proximity};
pub use crate::inference::{InferenceResult, InferenceTrace};
pub use crate::sequential::ModelSnapshot;
pub use vp_common::{Principal, VisitClass};
pub use vp_config::{EngineSettings, Priors};

/// Available schema types with their descriptions.
pub fn available_schemas() -> Vec<(&'static str, &'static str)> {
    vec![
        // Configuration
        ("Priors", "Class priors and conditional probability tables (priors.json)"),
        ("EngineSettings", "Tenancy, overflow policy and workload cap (engine.json)"),
        // Inputs
        ("EvidenceVector", "Observed evidence for one visit"),
        ("EvidenceChannel", "Evidence channel names"),
        ("Proximity", "Categorical patient/physician distance"),
        ("VisitClass", "Visit classes (pph, ppr)"),
        ("Principal", "Caller identity"),
        // Outputs
        ("InferenceResult", "Likelihoods, joints, marginal, posteriors and prediction"),
        ("InferenceTrace", "Classification with per-channel factors"),
        ("ModelSnapshot", "Sequential model state"),
        ("ComplexInferenceOutcome", "Workload-derived ratio and resulting state"),
    ]
}

/// JSON Schema for a type by name, or None if the type is unknown.
pub fn generate_schema(type_name: &str) -> Option<Value> {
    let schema = match type_name {
        "Priors" => schema_for!(Priors),
        "EngineSettings" => schema_for!(EngineSettings),
        "EvidenceVector" => schema_for!(EvidenceVector),
        "EvidenceChannel" => schema_for!(EvidenceChannel),
        "Proximity" => schema_for!(Proximity),
        "VisitClass" => schema_for!(VisitClass),
        "Principal" => schema_for!(Principal),
        "InferenceResult" => schema_for!(InferenceResult),
        "InferenceTrace" => schema_for!(InferenceTrace),
        "ModelSnapshot" => schema_for!(ModelSnapshot),
        "ComplexInferenceOutcome" => schema_for!(ComplexInferenceOutcome),
        _ => return None,
    };

    serde_json::to_value(schema).ok()
}

/// All schemas keyed by type name.
pub fn generate_all_schemas() -> BTreeMap<String, Value> {
    available_schemas()
        .into_iter()
        .filter_map(|(name, _)| generate_schema(name).map(|s| (name.to_string(), s)))
        .collect()
}
