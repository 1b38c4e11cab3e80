//! Sequential odds-ratio updater.
//!
//! Folds one evidence item at a time into the running posterior:
//!
//! ```text
//! numerator   = posterior · ratio / SCALE
//! denominator = numerator + (SCALE − posterior)
//! posterior'  = numerator · SCALE / denominator      (unchanged if denominator = 0)
//! ```
//!
//! The updater is a pure transition `(state, input) → (state', events)`;
//! persistence and event publication belong to the caller.

use super::ledger::{EvidenceLedger, EvidenceRecord};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use vp_common::{Error, Result};
use vp_config::OverflowPolicy;
use vp_math::{checked_pow2, saturating_pow2, LikelihoodRatio, Probability, Scale};

/// Persistent state of one model instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelState {
    /// Fixed-point scale the probabilities below are expressed in.
    pub scale: u32,
    pub step: u64,
    pub prior: Probability,
    pub posterior: Probability,
    /// `2^step` under the configured overflow policy.
    pub complexity: u64,
    pub evidence: EvidenceLedger,
}

impl ModelState {
    /// Fresh model: prior = posterior = SCALE/2, step 0, complexity 1.
    pub fn initial(scale: Scale) -> Self {
        Self::with_prior(scale, scale.half())
    }

    fn with_prior(scale: Scale, prior: Probability) -> Self {
        ModelState {
            scale: scale.get(),
            step: 0,
            prior,
            posterior: prior,
            complexity: 1,
            evidence: EvidenceLedger::new(),
        }
    }

    /// Fails when the state was written under a different scale.
    pub fn ensure_scale(&self, scale: Scale) -> Result<()> {
        if self.scale != scale.get() {
            return Err(Error::ScaleMismatch {
                stored: self.scale,
                configured: scale.get(),
            });
        }
        Ok(())
    }

    pub fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            step: self.step,
            prior: self.prior,
            posterior: self.posterior,
            complexity: self.complexity,
            evidence_count: self.evidence.len(),
        }
    }
}

/// Read-only view of a model for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ModelSnapshot {
    pub step: u64,
    pub prior: Probability,
    pub posterior: Probability,
    pub complexity: u64,
    pub evidence_count: usize,
}

/// Events produced by a transition, in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UpdateEvent {
    StepAdvanced {
        step: u64,
    },
    PosteriorUpdated {
        step: u64,
        posterior: Probability,
        complexity: u64,
    },
    ModelReset {
        prior: Probability,
    },
}

/// Result of applying one input to a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: ModelState,
    pub events: Vec<UpdateEvent>,
}

/// Stateless updater parameterized by scale and overflow policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequentialUpdater {
    scale: Scale,
    overflow: OverflowPolicy,
}

impl SequentialUpdater {
    pub fn new(scale: Scale, overflow: OverflowPolicy) -> Self {
        SequentialUpdater { scale, overflow }
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    /// Fold one evidence item into `state`.
    ///
    /// Fails without producing a transition on a foreign scale, a duplicate
    /// identifier, an out-of-range stored posterior, or complexity overflow
    /// under [`OverflowPolicy::Reject`].
    pub fn submit(&self, state: &ModelState, id: &str, ratio: LikelihoodRatio) -> Result<Transition> {
        state.ensure_scale(self.scale)?;
        if state.evidence.contains(id) {
            return Err(Error::DuplicateEvidence { id: id.to_string() });
        }

        let step = state
            .step
            .checked_add(1)
            .ok_or_else(|| Error::InvalidState("step counter exhausted".to_string()))?;
        let complexity = self.complexity(step)?;
        let posterior = self.odds_update(state.posterior, ratio)?;

        let mut next = state.clone();
        next.evidence.append(EvidenceRecord {
            id: id.to_string(),
            ratio,
        })?;
        next.step = step;
        next.posterior = posterior;
        next.complexity = complexity;

        Ok(Transition {
            state: next,
            events: vec![
                UpdateEvent::StepAdvanced { step },
                UpdateEvent::PosteriorUpdated {
                    step,
                    posterior,
                    complexity,
                },
            ],
        })
    }

    /// Discard history and start over from `new_prior`.
    pub fn reset(&self, new_prior: u32) -> Result<Transition> {
        let prior = self
            .scale
            .probability(new_prior)
            .map_err(|_| Error::InvalidPrior {
                value: new_prior,
                scale: self.scale.get(),
            })?;

        Ok(Transition {
            state: ModelState::with_prior(self.scale, prior),
            events: vec![UpdateEvent::ModelReset { prior }],
        })
    }

    /// One odds-ratio step. A zero denominator leaves the posterior as is.
    pub fn odds_update(&self, posterior: Probability, ratio: LikelihoodRatio) -> Result<Probability> {
        let numerator = self.scale.scale_ratio(posterior, ratio)?;
        let complement = self.scale.complement(posterior)?;
        let denominator = numerator + u64::from(complement);
        if denominator == 0 {
            return Ok(posterior);
        }
        Ok(self.scale.divide(numerator, denominator)?)
    }

    fn complexity(&self, step: u64) -> Result<u64> {
        match self.overflow {
            OverflowPolicy::Saturate => Ok(saturating_pow2(step)),
            OverflowPolicy::Reject => checked_pow2(step).ok_or(Error::ComplexityOverflow { step }),
        }
    }
}
