//! Fuzz target for priors.json parsing and validation.
//!
//! Arbitrary bytes must never panic the parser or the validator, and any
//! table that validates must classify without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use vp_config::validate::validate_priors;
use vp_config::Priors;
use vp_core::evidence::{EvidenceVector, Proximity};
use vp_core::inference::classify;

fuzz_target!(|data: &[u8]| {
    let Ok(priors) = serde_json::from_slice::<Priors>(data) else {
        return;
    };
    if validate_priors(&priors).is_err() {
        return;
    }
    let _ = classify(
        &priors,
        &EvidenceVector::new()
            .with_proximity(Proximity::Near)
            .with_confirmation(true),
    );
});
