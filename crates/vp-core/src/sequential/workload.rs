//! Deterministic hash-chain workload for complex inference.
//!
//! The chain simulates work proportional to the model's complexity and
//! derives a likelihood ratio from the final digest. It is reproducible by
//! construction and must never be used as a source of randomness.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use vp_math::{LikelihoodRatio, Scale};

/// Ratio derived by the workload plus how many rounds it took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadOutcome {
    pub ratio: LikelihoodRatio,
    pub iterations: u64,
}

/// Run `min(complexity, max_iterations)` rounds of
/// `acc = SHA-256(acc ‖ i as big-endian u64)` seeded with `SHA-256(id)`.
///
/// The ratio is the first eight digest bytes (big-endian) reduced into
/// `[0, 2·SCALE]`, capped at `u32::MAX` for very large scales.
pub fn derive_ratio(id: &str, complexity: u64, max_iterations: u64, scale: Scale) -> WorkloadOutcome {
    let iterations = complexity.min(max_iterations);

    let mut acc = [0u8; 32];
    acc.copy_from_slice(&Sha256::digest(id.as_bytes()));
    for i in 0..iterations {
        let mut hasher = Sha256::new();
        hasher.update(acc);
        hasher.update(i.to_be_bytes());
        acc.copy_from_slice(&hasher.finalize());
    }

    let mut head = [0u8; 8];
    head.copy_from_slice(&acc[..8]);
    let word = u64::from_be_bytes(head);

    let upper = (2 * u64::from(scale.get())).min(u64::from(u32::MAX));
    let raw = word % (upper + 1);

    WorkloadOutcome {
        ratio: LikelihoodRatio::new(u32::try_from(raw).unwrap_or(u32::MAX)),
        iterations,
    }
}
