//! Transactional engine facade.
//!
//! Every operation takes `&mut self` and runs as one transaction: new state
//! is computed on a copy, saved, then the audit batch is published. If the
//! sink refuses the batch the previous state is written back, so a failed
//! operation never leaves a trace in the store. If that write-back fails too
//! the error names both causes.

use crate::access::AccessGate;
use crate::audit::{AuditEntry, AuditRecord, AuditSink};
use crate::evidence::{EvidenceChannel, EvidenceVector};
use crate::inference::{self, InferenceResult};
use crate::log_event;
use crate::logging::{event_names, generate_run_id, get_host_id, LogContext, Stage};
use crate::sequential::{
    derive_ratio, EvidenceRecord, ModelSnapshot, ModelState, SequentialUpdater, Transition,
    UpdateEvent,
};
use crate::store::{StateKey, StateStore, StoreError};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::field::display;
use vp_common::{Error, Principal, Result, VisitClass};
use vp_config::validate::{validate_engine_settings, validate_priors};
use vp_config::{EngineSettings, Priors, Tenancy};
use vp_math::{LikelihoodRatio, Probability, Scale};

/// Who is calling and when. Supplied by the host so that every audit record
/// is a pure function of the operation inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    pub caller: Principal,
    pub timestamp: DateTime<Utc>,
}

impl InvocationContext {
    pub fn new(caller: Principal, timestamp: DateTime<Utc>) -> Self {
        InvocationContext { caller, timestamp }
    }

    /// Context stamped with the wall clock. For the CLI only.
    pub fn now(caller: Principal) -> Self {
        Self::new(caller, Utc::now())
    }
}

/// Result of an owner-run complex inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ComplexInferenceOutcome {
    /// Ratio derived by the workload and submitted as evidence.
    pub ratio: LikelihoodRatio,
    /// Hash-chain rounds actually performed.
    pub iterations: u64,
    pub state: ModelSnapshot,
}

pub struct Engine<S: StateStore, A: AuditSink> {
    priors: Priors,
    settings: EngineSettings,
    scale: Scale,
    updater: SequentialUpdater,
    store: S,
    sink: A,
    log: LogContext,
}

impl<S: StateStore, A: AuditSink> Engine<S, A> {
    /// Build an engine over validated configuration.
    pub fn new(priors: Priors, settings: EngineSettings, store: S, sink: A) -> Result<Self> {
        validate_priors(&priors)?;
        validate_engine_settings(&settings)?;
        let scale = priors.scale()?;
        let updater = SequentialUpdater::new(scale, settings.complexity_overflow);

        Ok(Engine {
            priors,
            settings,
            scale,
            updater,
            store,
            sink,
            log: LogContext::new(generate_run_id(), get_host_id()),
        })
    }

    /// Replace the correlation context used for log events.
    pub fn with_log_context(mut self, log: LogContext) -> Self {
        self.log = log;
        self
    }

    pub fn priors(&self) -> &Priors {
        &self.priors
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sink(&self) -> &A {
        &self.sink
    }

    // ------------------------------------------------------------------
    // Ownership
    // ------------------------------------------------------------------

    /// Establish the single owner. Allowed exactly once.
    pub fn initialize(&mut self, ctx: &InvocationContext, owner: Principal) -> Result<()> {
        if let Some(existing) = self.store.load_owner()? {
            log_event!(self.log, WARN, event_names::ACCESS_DENIED, Stage::Init,
                "initialization refused: owner already set",
                caller = display(&ctx.caller));
            return Err(Error::AlreadyInitialized {
                owner: existing.to_string(),
            });
        }

        self.store.save_owner(&owner)?;
        let record = AuditRecord::OwnerInitialized {
            owner: owner.clone(),
        };
        if let Err(err) = self.publish(ctx, vec![record]) {
            let restored = self.store.remove_owner();
            return Err(self.rolled_back("owner", err, restored));
        }

        log_event!(self.log, INFO, event_names::ACCESS_INITIALIZED, Stage::Init,
            "owner initialized",
            owner = display(&owner));
        Ok(())
    }

    /// Current owner, if the deployment has been initialized.
    pub fn owner(&self) -> Result<Option<Principal>> {
        Ok(self.store.load_owner()?)
    }

    /// Hand ownership to `new_owner`. Owner-only.
    ///
    /// Returns the previous owner.
    pub fn transfer_ownership(
        &mut self,
        ctx: &InvocationContext,
        new_owner: Principal,
    ) -> Result<Principal> {
        let gate = self.gate()?;
        let next = gate
            .transfer(&ctx.caller, new_owner)
            .inspect_err(|_| self.log_denied(ctx, "transfer_ownership"))?;
        let previous = gate.owner().clone();

        self.store.save_owner(next.owner())?;
        let record = AuditRecord::OwnershipTransferred {
            from: previous.clone(),
            to: next.owner().clone(),
        };
        if let Err(err) = self.publish(ctx, vec![record]) {
            let restored = self.store.save_owner(&previous);
            return Err(self.rolled_back("owner", err, restored));
        }

        log_event!(self.log, INFO, event_names::ACCESS_TRANSFERRED, Stage::Access,
            "ownership transferred",
            from = display(&previous),
            to = display(&next.owner()));
        Ok(previous)
    }

    // ------------------------------------------------------------------
    // Batch classification
    // ------------------------------------------------------------------

    /// Classify a visit and publish its trace and decision.
    pub fn predict_visit(
        &mut self,
        ctx: &InvocationContext,
        evidence: &EvidenceVector,
    ) -> Result<InferenceResult> {
        let trace = inference::classify(&self.priors, evidence).inspect_err(|err| {
            log_event!(self.log, WARN, event_names::INFER_REJECTED, Stage::Infer,
                "classification rejected",
                error = display(&err));
        })?;
        let result = trace.result.clone();

        let records = vec![
            AuditRecord::InferenceTrace {
                trace: Box::new(trace),
            },
            AuditRecord::Decision {
                predicted: result.predicted,
                posterior: result.confidence(),
            },
        ];
        self.publish(ctx, records)?;

        log_event!(self.log, INFO, event_names::INFER_CLASSIFIED, Stage::Infer,
            "visit classified",
            predicted = display(&result.predicted),
            posterior_pph = result.posterior.pph.raw(),
            posterior_ppr = result.posterior.ppr.raw());
        Ok(result)
    }

    /// Posterior of one class. Pure; publishes nothing.
    pub fn posterior_probability(
        &self,
        evidence: &EvidenceVector,
        class: VisitClass,
    ) -> Result<Probability> {
        inference::posterior_probability(&self.priors, evidence, class)
    }

    // ------------------------------------------------------------------
    // Sequential updates
    // ------------------------------------------------------------------

    /// Fold one evidence item into the caller's model.
    pub fn submit_evidence(
        &mut self,
        ctx: &InvocationContext,
        id: &str,
        ratio: LikelihoodRatio,
    ) -> Result<ModelSnapshot> {
        self.gate()?;
        let key = self.key_for(ctx);
        let stored = self.store.load_model(&key)?;
        let current = self.current(&stored)?;

        let transition = self
            .updater
            .submit(&current, id, ratio)
            .inspect_err(|err| self.log_update_rejected(&key, err))?;
        self.commit(ctx, &key, stored, transition)
    }

    /// Submit under the canonical identifier of a numeric evidence type.
    pub fn submit_evidence_by_type(
        &mut self,
        ctx: &InvocationContext,
        code: i64,
        ratio: LikelihoodRatio,
    ) -> Result<ModelSnapshot> {
        let channel = EvidenceChannel::from_code(code)?;
        self.submit_evidence(ctx, channel.identifier(), ratio)
    }

    /// Derive a ratio from the hash-chain workload and submit it. Owner-only.
    pub fn perform_complex_inference(
        &mut self,
        ctx: &InvocationContext,
        id: &str,
    ) -> Result<ComplexInferenceOutcome> {
        self.authorize(ctx, "perform_complex_inference")?;
        let key = self.key_for(ctx);
        let stored = self.store.load_model(&key)?;
        let current = self.current(&stored)?;

        let outcome = derive_ratio(
            id,
            current.complexity,
            self.settings.max_workload_iterations,
            self.scale,
        );
        log_event!(self.log, DEBUG, event_names::UPDATE_WORKLOAD, Stage::Update,
            "workload finished",
            iterations = outcome.iterations,
            ratio = outcome.ratio.raw());

        let transition = self
            .updater
            .submit(&current, id, outcome.ratio)
            .inspect_err(|err| self.log_update_rejected(&key, err))?;
        let state = self.commit(ctx, &key, stored, transition)?;

        Ok(ComplexInferenceOutcome {
            ratio: outcome.ratio,
            iterations: outcome.iterations,
            state,
        })
    }

    /// Discard the model's history and restart from `new_prior`. Owner-only.
    pub fn reset_model(&mut self, ctx: &InvocationContext, new_prior: u32) -> Result<ModelSnapshot> {
        self.authorize(ctx, "reset_model")?;
        let key = self.key_for(ctx);
        let stored = self.store.load_model(&key)?;

        let transition = self
            .updater
            .reset(new_prior)
            .inspect_err(|err| self.log_update_rejected(&key, err))?;
        self.commit(ctx, &key, stored, transition)
    }

    pub fn model_state(&self, ctx: &InvocationContext) -> Result<ModelSnapshot> {
        self.gate()?;
        let key = self.key_for(ctx);
        let stored = self.store.load_model(&key)?;
        Ok(self.current(&stored)?.snapshot())
    }

    pub fn evidence_at(&self, ctx: &InvocationContext, index: usize) -> Result<EvidenceRecord> {
        self.gate()?;
        let key = self.key_for(ctx);
        let stored = self.store.load_model(&key)?;
        self.current(&stored)?.evidence.get(index).cloned()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn gate(&self) -> Result<AccessGate> {
        self.store
            .load_owner()?
            .map(AccessGate::new)
            .ok_or(Error::NotInitialized)
    }

    fn authorize(&self, ctx: &InvocationContext, operation: &str) -> Result<()> {
        self.gate()?
            .authorize(&ctx.caller)
            .inspect_err(|_| self.log_denied(ctx, operation))
    }

    fn key_for(&self, ctx: &InvocationContext) -> StateKey {
        match self.settings.tenancy {
            Tenancy::Global => StateKey::Global,
            Tenancy::PerCaller => StateKey::Caller(ctx.caller.clone()),
        }
    }

    /// Stored state, or a fresh model for keys never written.
    ///
    /// Stored state written under another scale is refused rather than
    /// reinterpreted.
    fn current(&self, stored: &Option<ModelState>) -> Result<ModelState> {
        match stored {
            Some(state) => {
                state.ensure_scale(self.scale)?;
                Ok(state.clone())
            }
            None => Ok(ModelState::initial(self.scale)),
        }
    }

    /// Save the new state, publish its events, and restore `previous` if the
    /// sink refuses.
    fn commit(
        &mut self,
        ctx: &InvocationContext,
        key: &StateKey,
        previous: Option<ModelState>,
        transition: Transition,
    ) -> Result<ModelSnapshot> {
        let records = audit_records(key, &transition)?;

        self.store.save_model(key, &transition.state)?;
        log_event!(self.log, DEBUG, event_names::STATE_SAVED, Stage::Persist,
            "model state saved",
            key = display(&key),
            step = transition.state.step);

        if let Err(err) = self.publish(ctx, records) {
            let restored = match &previous {
                Some(state) => self.store.save_model(key, state),
                None => self.store.remove_model(key),
            };
            return Err(self.rolled_back(&key.to_string(), err, restored));
        }

        for event in &transition.events {
            match event {
                UpdateEvent::PosteriorUpdated {
                    step,
                    posterior,
                    complexity,
                } => {
                    log_event!(self.log, INFO, event_names::UPDATE_POSTERIOR, Stage::Update,
                        "posterior updated",
                        key = display(&key),
                        step = *step,
                        posterior = posterior.raw(),
                        complexity = *complexity);
                }
                UpdateEvent::ModelReset { prior } => {
                    log_event!(self.log, INFO, event_names::MODEL_RESET, Stage::Update,
                        "model reset",
                        key = display(&key),
                        prior = prior.raw());
                }
                UpdateEvent::StepAdvanced { .. } => {}
            }
        }

        Ok(transition.state.snapshot())
    }

    fn publish(&mut self, ctx: &InvocationContext, records: Vec<AuditRecord>) -> Result<()> {
        let count = records.len();
        let batch = records
            .into_iter()
            .map(|record| AuditEntry::new(&ctx.caller, ctx.timestamp, record))
            .collect();
        self.sink.publish(batch)?;
        log_event!(self.log, DEBUG, event_names::AUDIT_PUBLISHED, Stage::Persist,
            "audit batch published",
            entries = count);
        Ok(())
    }

    /// Outcome of undoing a write after the sink refused its batch.
    ///
    /// When the undo itself fails the stored state no longer matches the
    /// audit log, and the returned error carries both causes.
    fn rolled_back(
        &self,
        target: &str,
        audit_err: Error,
        restored: std::result::Result<(), StoreError>,
    ) -> Error {
        match restored {
            Ok(()) => {
                log_event!(self.log, WARN, event_names::AUDIT_ROLLBACK, Stage::Persist,
                    "audit publish failed; previous state restored",
                    target = target,
                    error = display(&audit_err));
                audit_err
            }
            Err(store_err) => {
                log_event!(self.log, ERROR, event_names::AUDIT_ROLLBACK_FAILED, Stage::Persist,
                    "audit publish failed and previous state could not be restored",
                    target = target,
                    audit_error = display(&audit_err),
                    store_error = display(&store_err));
                Error::Store(format!(
                    "{target} holds an unaudited change: {audit_err}; restore failed: {store_err}"
                ))
            }
        }
    }

    fn log_denied(&self, ctx: &InvocationContext, operation: &str) {
        log_event!(self.log, WARN, event_names::ACCESS_DENIED, Stage::Access,
            "caller is not the owner",
            caller = display(&ctx.caller),
            operation = operation);
    }

    fn log_update_rejected(&self, key: &StateKey, err: &Error) {
        log_event!(self.log, WARN, event_names::UPDATE_REJECTED, Stage::Update,
            "update rejected",
            key = display(&key),
            code = err.code(),
            error = display(&err));
    }
}

/// Audit records for a model transition, in event order.
fn audit_records(key: &StateKey, transition: &Transition) -> Result<Vec<AuditRecord>> {
    transition
        .events
        .iter()
        .map(|event| match *event {
            UpdateEvent::StepAdvanced { step } => {
                let evidence = transition.state.evidence.iter().last().cloned().ok_or_else(|| {
                    Error::InvalidState("step advanced without a ledger entry".to_string())
                })?;
                Ok(AuditRecord::StepAdvanced {
                    key: key.clone(),
                    step,
                    evidence,
                })
            }
            UpdateEvent::PosteriorUpdated {
                step,
                posterior,
                complexity,
            } => Ok(AuditRecord::PosteriorUpdated {
                key: key.clone(),
                step,
                posterior,
                complexity,
            }),
            UpdateEvent::ModelReset { prior } => Ok(AuditRecord::ModelReset {
                key: key.clone(),
                prior,
            }),
        })
        .collect()
}
