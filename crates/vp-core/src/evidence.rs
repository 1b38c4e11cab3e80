//! Evidence channels and observation vectors.
//!
//! Every channel carries an explicit presence flag (`None` = not observed).
//! An absent channel contributes no factor to the likelihood; it is never
//! treated as a negative observation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use vp_common::{Error, Result};

/// Categorical distance between patient and physician at visit time.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Proximity {
    VeryClose,
    Close,
    Near,
    Far,
}

impl Proximity {
    pub const ALL: [Proximity; 4] = [
        Proximity::VeryClose,
        Proximity::Close,
        Proximity::Near,
        Proximity::Far,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Proximity::VeryClose => "very_close",
            Proximity::Close => "close",
            Proximity::Near => "near",
            Proximity::Far => "far",
        }
    }
}

impl std::fmt::Display for Proximity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Observed evidence for one visit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EvidenceVector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proximity: Option<Proximity>,
    /// Whether the visit was confirmed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<bool>,
    /// Whether a prescription was issued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescription: Option<bool>,
    /// Whether device telemetry was captured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_data: Option<bool>,
}

impl EvidenceVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_proximity(mut self, value: Proximity) -> Self {
        self.proximity = Some(value);
        self
    }

    pub fn with_confirmation(mut self, value: bool) -> Self {
        self.confirmation = Some(value);
        self
    }

    pub fn with_prescription(mut self, value: bool) -> Self {
        self.prescription = Some(value);
        self
    }

    pub fn with_device_data(mut self, value: bool) -> Self {
        self.device_data = Some(value);
        self
    }

    /// Observed channels in evaluation order.
    ///
    /// Each factor is truncated as it is applied, so this order is part of
    /// the numeric contract: proximity, confirmation, prescription, device data.
    pub fn observations(&self) -> Vec<(EvidenceChannel, ObservedValue)> {
        let mut out = Vec::with_capacity(4);
        if let Some(p) = self.proximity {
            out.push((EvidenceChannel::Proximity, ObservedValue::Category(p)));
        }
        if let Some(v) = self.confirmation {
            out.push((EvidenceChannel::Confirmation, ObservedValue::Flag(v)));
        }
        if let Some(v) = self.prescription {
            out.push((EvidenceChannel::Prescription, ObservedValue::Flag(v)));
        }
        if let Some(v) = self.device_data {
            out.push((EvidenceChannel::DeviceData, ObservedValue::Flag(v)));
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.proximity.is_none()
            && self.confirmation.is_none()
            && self.prescription.is_none()
            && self.device_data.is_none()
    }
}

/// The closed set of evidence channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceChannel {
    Proximity,
    Confirmation,
    DeviceData,
    Prescription,
}

impl EvidenceChannel {
    /// Channels in evidence-type-code order (1..=4).
    pub const ALL: [EvidenceChannel; 4] = [
        EvidenceChannel::Proximity,
        EvidenceChannel::Confirmation,
        EvidenceChannel::DeviceData,
        EvidenceChannel::Prescription,
    ];

    /// Map a numeric evidence type code to its channel.
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            1 => Ok(EvidenceChannel::Proximity),
            2 => Ok(EvidenceChannel::Confirmation),
            3 => Ok(EvidenceChannel::DeviceData),
            4 => Ok(EvidenceChannel::Prescription),
            _ => Err(Error::InvalidEvidenceType { code }),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            EvidenceChannel::Proximity => 1,
            EvidenceChannel::Confirmation => 2,
            EvidenceChannel::DeviceData => 3,
            EvidenceChannel::Prescription => 4,
        }
    }

    /// Canonical ledger identifier for submissions made by type code.
    pub fn identifier(self) -> &'static str {
        match self {
            EvidenceChannel::Proximity => "proximity",
            EvidenceChannel::Confirmation => "confirmation",
            EvidenceChannel::DeviceData => "device_data",
            EvidenceChannel::Prescription => "prescription",
        }
    }
}

impl std::fmt::Display for EvidenceChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

/// The value seen on one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ObservedValue {
    Category(Proximity),
    Flag(bool),
}

impl std::fmt::Display for ObservedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObservedValue::Category(p) => write!(f, "{}", p),
            ObservedValue::Flag(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_codes_map_to_canonical_identifiers() {
        let ids: Vec<&str> = (1..=4)
            .map(|code| EvidenceChannel::from_code(code).unwrap().identifier())
            .collect();
        assert_eq!(
            ids,
            vec!["proximity", "confirmation", "device_data", "prescription"]
        );
        for channel in EvidenceChannel::ALL {
            assert_eq!(EvidenceChannel::from_code(channel.code()).unwrap(), channel);
        }
    }

    #[test]
    fn unknown_type_codes_are_rejected() {
        for code in [0, 5, -1, i64::MAX] {
            let err = EvidenceChannel::from_code(code).unwrap_err();
            assert!(matches!(err, Error::InvalidEvidenceType { code: c } if c == code));
        }
    }

    #[test]
    fn observations_follow_evaluation_order() {
        let evidence = EvidenceVector::new()
            .with_device_data(true)
            .with_prescription(false)
            .with_proximity(Proximity::Near);
        let channels: Vec<EvidenceChannel> =
            evidence.observations().into_iter().map(|(c, _)| c).collect();
        assert_eq!(
            channels,
            vec![
                EvidenceChannel::Proximity,
                EvidenceChannel::Prescription,
                EvidenceChannel::DeviceData
            ]
        );
    }

    #[test]
    fn absent_channels_are_omitted_from_json() {
        let evidence = EvidenceVector::new().with_proximity(Proximity::VeryClose);
        let json = serde_json::to_string(&evidence).unwrap();
        assert_eq!(json, r#"{"proximity":"very_close"}"#);

        let parsed: EvidenceVector = serde_json::from_str("{}").unwrap();
        assert!(parsed.is_empty());
    }
}
