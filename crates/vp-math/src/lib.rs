//! Visit Predict math utilities.

pub mod math;

pub use math::fixed::*;
pub use math::growth::*;
