//! Class priors and conditional probability tables.
//!
//! Every probability is a raw integer interpreted against `scale`, so
//! `{"scale": 100, ... "confirmation": 85}` means P(confirmed | class) = 0.85.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use vp_common::VisitClass;
use vp_math::{MathError, Probability, Scale};

/// Complete priors configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Priors {
    pub schema_version: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Fixed-point denominator; every probability below is `value / scale`.
    #[serde(default = "default_scale")]
    pub scale: u32,

    pub classes: ClassPriors,
}

fn default_scale() -> u32 {
    Scale::PERCENT.get()
}

/// Per-class prior and conditional probability table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClassPriors {
    pub pph: ClassParams,
    pub ppr: ClassParams,
}

/// Parameters for a single visit class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClassParams {
    /// P(class).
    pub prior: u32,

    /// P(proximity = v | class) for every proximity bucket.
    pub proximity: ProximityTable,

    /// P(confirmation observed | class).
    pub confirmation: u32,

    /// P(prescription issued | class).
    pub prescription: u32,

    /// P(device data present | class).
    pub device_data: u32,
}

/// Categorical distribution over proximity buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProximityTable {
    pub very_close: u32,
    pub close: u32,
    pub near: u32,
    pub far: u32,
}

impl ProximityTable {
    pub fn total(&self) -> u64 {
        u64::from(self.very_close)
            + u64::from(self.close)
            + u64::from(self.near)
            + u64::from(self.far)
    }

    /// (name, value) pairs in declaration order.
    pub fn entries(&self) -> [(&'static str, u32); 4] {
        [
            ("very_close", self.very_close),
            ("close", self.close),
            ("near", self.near),
            ("far", self.far),
        ]
    }
}

impl ClassPriors {
    pub fn get(&self, class: VisitClass) -> &ClassParams {
        match class {
            VisitClass::Pph => &self.pph,
            VisitClass::Ppr => &self.ppr,
        }
    }
}

impl Priors {
    /// Load priors from a JSON file.
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

    /// Parse priors from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, crate::validate::ValidationError> {
        serde_json::from_str(json).map_err(|e| {
            crate::validate::ValidationError::ParseError(format!("Invalid JSON: {}", e))
        })
    }

    /// The deployment scale. Fails only for a zero scale.
    pub fn scale(&self) -> Result<Scale, MathError> {
        Scale::new(self.scale)
    }

    pub fn class(&self, class: VisitClass) -> &ClassParams {
        self.classes.get(class)
    }

    /// P(class) as an unchecked probability.
    pub fn prior(&self, class: VisitClass) -> Probability {
        Probability::new(self.class(class).prior)
    }
}

impl Default for Priors {
    fn default() -> Self {
        Priors {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            description: Some("Built-in visit modality priors".to_string()),
            scale: default_scale(),
            classes: ClassPriors {
                pph: ClassParams {
                    prior: 60,
                    proximity: ProximityTable {
                        very_close: 45,
                        close: 35,
                        near: 15,
                        far: 5,
                    },
                    confirmation: 85,
                    prescription: 60,
                    device_data: 30,
                },
                ppr: ClassParams {
                    prior: 40,
                    proximity: ProximityTable {
                        very_close: 5,
                        close: 10,
                        near: 25,
                        far: 60,
                    },
                    confirmation: 40,
                    prescription: 55,
                    device_data: 80,
                },
            },
        }
    }
}
