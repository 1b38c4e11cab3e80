//! Fuzz target for classification and sequential updates.
//!
//! Checks the posterior-sum invariant for arbitrary evidence and that the
//! updater keeps posteriors inside the scale for arbitrary ratios.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use vp_config::{OverflowPolicy, Priors};
use vp_core::evidence::{EvidenceVector, Proximity};
use vp_core::inference::classify;
use vp_core::sequential::{ModelState, SequentialUpdater};
use vp_math::{LikelihoodRatio, Scale};

#[derive(Debug, Arbitrary)]
struct Input {
    proximity: Option<u8>,
    confirmation: Option<bool>,
    prescription: Option<bool>,
    device_data: Option<bool>,
    prior: u16,
    updates: Vec<(u8, u32)>,
}

fuzz_target!(|input: Input| {
    let priors = Priors::default();
    let evidence = EvidenceVector {
        proximity: input
            .proximity
            .map(|p| Proximity::ALL[usize::from(p) % Proximity::ALL.len()]),
        confirmation: input.confirmation,
        prescription: input.prescription,
        device_data: input.device_data,
    };
    if let Ok(trace) = classify(&priors, &evidence) {
        let sum = trace.result.posterior.pph.raw() + trace.result.posterior.ppr.raw();
        assert!(sum == priors.scale || sum + 1 == priors.scale);
    }

    let updater = SequentialUpdater::new(Scale::BASIS_POINTS, OverflowPolicy::Saturate);
    let mut state = match updater.reset(u32::from(input.prior)) {
        Ok(transition) => transition.state,
        Err(_) => ModelState::initial(Scale::BASIS_POINTS),
    };
    for (id, ratio) in input.updates.iter().take(64) {
        if let Ok(next) = updater.submit(&state, &id.to_string(), LikelihoodRatio::new(*ratio)) {
            state = next.state;
        }
        assert!(state.posterior.raw() <= Scale::BASIS_POINTS.get());
    }
});
