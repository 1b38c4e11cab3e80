//! Inference engine modules.

pub mod classifier;
pub mod likelihood;

pub use classifier::{classify, posterior_probability, ClassScores, InferenceResult, InferenceTrace};
pub use likelihood::{compute_likelihood, ClassLikelihood, EvidenceTerm};
