//! Per-class likelihood under conditional independence.
//!
//! `L(class) = Π P(observed_i | class)` over observed channels, folded in
//! fixed point starting from SCALE and truncated after every factor.

use crate::evidence::{EvidenceChannel, EvidenceVector, ObservedValue, Proximity};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use vp_common::{Error, Result, VisitClass};
use vp_config::priors::ClassParams;
use vp_config::Priors;
use vp_math::{Probability, Scale};

/// One applied likelihood factor, kept for the inference trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EvidenceTerm {
    pub channel: EvidenceChannel,
    pub observed: ObservedValue,
    /// P(observed | class).
    pub factor: Probability,
    /// Running likelihood after this factor.
    pub likelihood: Probability,
}

/// Likelihood for a single class with its contributing terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClassLikelihood {
    pub class: VisitClass,
    pub likelihood: Probability,
    pub terms: Vec<EvidenceTerm>,
}

/// Compute `P(evidence | class)`.
///
/// Fails with `InvalidProbability` when a table entry lies outside
/// `[0, SCALE]`.
pub fn compute_likelihood(
    priors: &Priors,
    scale: Scale,
    evidence: &EvidenceVector,
    class: VisitClass,
) -> Result<ClassLikelihood> {
    let params = priors.class(class);
    let mut likelihood = scale.one();
    let mut terms = Vec::new();

    for (channel, observed) in evidence.observations() {
        let factor = conditional(params, scale, channel, observed)?;
        likelihood = scale.multiply(likelihood, factor)?;
        terms.push(EvidenceTerm {
            channel,
            observed,
            factor,
            likelihood,
        });
    }

    Ok(ClassLikelihood {
        class,
        likelihood,
        terms,
    })
}

/// `P(observed | class)` from the conditional probability table.
///
/// Boolean channels store `P(true | class)`; a `false` observation uses the
/// complement.
pub fn conditional(
    params: &ClassParams,
    scale: Scale,
    channel: EvidenceChannel,
    observed: ObservedValue,
) -> Result<Probability> {
    match (channel, observed) {
        (EvidenceChannel::Proximity, ObservedValue::Category(bucket)) => {
            let raw = match bucket {
                Proximity::VeryClose => params.proximity.very_close,
                Proximity::Close => params.proximity.close,
                Proximity::Near => params.proximity.near,
                Proximity::Far => params.proximity.far,
            };
            Ok(scale.probability(raw)?)
        }
        (EvidenceChannel::Confirmation, ObservedValue::Flag(v)) => {
            flag(scale, params.confirmation, v)
        }
        (EvidenceChannel::Prescription, ObservedValue::Flag(v)) => {
            flag(scale, params.prescription, v)
        }
        (EvidenceChannel::DeviceData, ObservedValue::Flag(v)) => {
            flag(scale, params.device_data, v)
        }
        (channel, observed) => Err(Error::InvalidState(format!(
            "channel {} cannot take value {}",
            channel, observed
        ))),
    }
}

fn flag(scale: Scale, p_true: u32, observed: bool) -> Result<Probability> {
    let p_true = scale.probability(p_true)?;
    if observed {
        Ok(p_true)
    } else {
        Ok(scale.complement(p_true)?)
    }
}
