//! The two visit classes.

use clap::ValueEnum;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Visit modality being predicted.
///
/// Declaration order matters: `Pph` is the first-declared class and wins ties.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum VisitClass {
    /// In-person visit.
    Pph,
    /// Remote visit.
    Ppr,
}

impl VisitClass {
    pub const ALL: [VisitClass; 2] = [VisitClass::Pph, VisitClass::Ppr];

    pub fn label(self) -> &'static str {
        match self {
            VisitClass::Pph => "pph",
            VisitClass::Ppr => "ppr",
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            VisitClass::Pph => "in-person",
            VisitClass::Ppr => "remote",
        }
    }

    pub fn other(self) -> VisitClass {
        match self {
            VisitClass::Pph => VisitClass::Ppr,
            VisitClass::Ppr => VisitClass::Pph,
        }
    }
}

impl std::fmt::Display for VisitClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
