//! Naive-Bayes classification P(C|x) for the two visit classes.
//!
//! joint(C) = L(C) · prior(C), marginal = Σ joint, posterior(C) =
//! joint(C) · SCALE / marginal. Every step truncates, so the two posteriors
//! sum to SCALE or SCALE − 1.

use super::likelihood::{compute_likelihood, EvidenceTerm};
use crate::evidence::EvidenceVector;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use vp_common::{Error, Result, VisitClass};
use vp_config::Priors;
use vp_math::Probability;

/// Per-class values for the two-class model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClassScores {
    pub pph: Probability,
    pub ppr: Probability,
}

impl ClassScores {
    pub fn get(&self, class: VisitClass) -> Probability {
        match class {
            VisitClass::Pph => self.pph,
            VisitClass::Ppr => self.ppr,
        }
    }
}

/// Outcome of one classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InferenceResult {
    pub likelihood: ClassScores,
    pub joint: ClassScores,
    /// Sum of the joints; may exceed SCALE only in malformed tables.
    pub marginal: u64,
    pub posterior: ClassScores,
    pub predicted: VisitClass,
}

impl InferenceResult {
    /// Posterior of the predicted class.
    pub fn confidence(&self) -> Probability {
        self.posterior.get(self.predicted)
    }
}

/// Everything needed to reproduce a decision: inputs, per-channel factors
/// and the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InferenceTrace {
    pub scale: u32,
    pub prior: ClassScores,
    pub evidence: EvidenceVector,
    pub terms_pph: Vec<EvidenceTerm>,
    pub terms_ppr: Vec<EvidenceTerm>,
    pub result: InferenceResult,
}

/// Classify a visit. Pure: identical inputs give identical traces.
///
/// Fails with `InvalidState` when both joints are zero, i.e. no class can
/// explain the evidence.
pub fn classify(priors: &Priors, evidence: &EvidenceVector) -> Result<InferenceTrace> {
    let scale = priors.scale()?;

    let prior = ClassScores {
        pph: scale.check(priors.prior(VisitClass::Pph))?,
        ppr: scale.check(priors.prior(VisitClass::Ppr))?,
    };

    let pph = compute_likelihood(priors, scale, evidence, VisitClass::Pph)?;
    let ppr = compute_likelihood(priors, scale, evidence, VisitClass::Ppr)?;

    let likelihood = ClassScores {
        pph: pph.likelihood,
        ppr: ppr.likelihood,
    };
    let joint = ClassScores {
        pph: scale.multiply(likelihood.pph, prior.pph)?,
        ppr: scale.multiply(likelihood.ppr, prior.ppr)?,
    };

    let marginal = u64::from(joint.pph) + u64::from(joint.ppr);
    if marginal == 0 {
        return Err(Error::InvalidState(
            "marginal likelihood is zero for the observed evidence".to_string(),
        ));
    }

    let posterior = ClassScores {
        pph: scale.divide(u64::from(joint.pph), marginal)?,
        ppr: scale.divide(u64::from(joint.ppr), marginal)?,
    };

    // Ties go to the first-declared class.
    let predicted = if posterior.pph >= posterior.ppr {
        VisitClass::Pph
    } else {
        VisitClass::Ppr
    };

    Ok(InferenceTrace {
        scale: scale.get(),
        prior,
        evidence: *evidence,
        terms_pph: pph.terms,
        terms_ppr: ppr.terms,
        result: InferenceResult {
            likelihood,
            joint,
            marginal,
            posterior,
            predicted,
        },
    })
}

/// Posterior of one class, without producing a trace for publication.
pub fn posterior_probability(
    priors: &Priors,
    evidence: &EvidenceVector,
    class: VisitClass,
) -> Result<Probability> {
    classify(priors, evidence).map(|trace| trace.result.posterior.get(class))
}
