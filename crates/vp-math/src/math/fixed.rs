//! Scaled-integer probability arithmetic.
//!
//! A [`Probability`] is an integer `p` in `[0, SCALE]` standing for `p / SCALE`.
//! All rescaling uses one rounding rule: truncating integer division. Products
//! are formed in `u128` before rescaling so no admissible input can overflow,
//! which keeps independent implementations bit-for-bit identical.
//!
//! ```
//! use vp_math::{Probability, Scale};
//!
//! let scale = Scale::PERCENT;
//! let a = scale.probability(90).unwrap();
//! let b = scale.probability(60).unwrap();
//! assert_eq!(scale.multiply(a, b).unwrap(), Probability::new(54));
//! assert_eq!(scale.complement(a).unwrap(), Probability::new(10));
//! ```

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised by fixed-point operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("scale must be > 0")]
    ZeroScale,

    #[error("value {value} is outside [0, {scale}]")]
    OutOfRange { value: u128, scale: u32 },

    #[error("division by zero while normalizing")]
    DivisionByZero,
}

/// Deployment-wide fixed-point denominator.
///
/// Chosen once per deployment; every [`Probability`] is interpreted against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, JsonSchema)]
#[serde(transparent)]
pub struct Scale(u32);

impl Scale {
    /// Two decimal digits of precision (`100 == 1.0`).
    pub const PERCENT: Scale = Scale(100);

    /// Four decimal digits of precision (`10_000 == 1.0`).
    pub const BASIS_POINTS: Scale = Scale(10_000);

    pub fn new(raw: u32) -> Result<Self, MathError> {
        if raw == 0 {
            return Err(MathError::ZeroScale);
        }
        Ok(Scale(raw))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// The probability representing 1.0.
    pub fn one(self) -> Probability {
        Probability(self.0)
    }

    /// The probability representing 0.5 (truncated for odd scales).
    pub fn half(self) -> Probability {
        Probability(self.0 / 2)
    }

    /// Likelihood ratio representing 1.0 (no evidence either way).
    pub fn neutral_ratio(self) -> LikelihoodRatio {
        LikelihoodRatio(self.0)
    }

    /// Validate a raw value as a probability under this scale.
    pub fn probability(self, raw: u32) -> Result<Probability, MathError> {
        self.check(Probability(raw))
    }

    /// Check that `p` lies in `[0, SCALE]`.
    pub fn check(self, p: Probability) -> Result<Probability, MathError> {
        if p.0 > self.0 {
            return Err(MathError::OutOfRange {
                value: u128::from(p.0),
                scale: self.0,
            });
        }
        Ok(p)
    }

    /// `a * b / SCALE`, truncating.
    pub fn multiply(self, a: Probability, b: Probability) -> Result<Probability, MathError> {
        let a = self.check(a)?;
        let b = self.check(b)?;
        let product = u128::from(a.0) * u128::from(b.0) / u128::from(self.0);
        // a, b <= SCALE, so the rescaled product is <= SCALE as well.
        self.narrow(product)
    }

    /// `SCALE - a`, i.e. `P(not x)`.
    pub fn complement(self, a: Probability) -> Result<Probability, MathError> {
        let a = self.check(a)?;
        Ok(Probability(self.0 - a.0))
    }

    /// `numerator * SCALE / denominator`, truncating.
    ///
    /// Fails with [`MathError::DivisionByZero`] for a zero denominator and with
    /// [`MathError::OutOfRange`] when the quotient exceeds `SCALE`.
    pub fn divide(self, numerator: u64, denominator: u64) -> Result<Probability, MathError> {
        if denominator == 0 {
            return Err(MathError::DivisionByZero);
        }
        let quotient = u128::from(numerator) * u128::from(self.0) / u128::from(denominator);
        self.narrow(quotient)
    }

    /// `p * ratio / SCALE`, truncating. The result may exceed `SCALE` when the
    /// ratio favours the hypothesis.
    pub fn scale_ratio(self, p: Probability, ratio: LikelihoodRatio) -> Result<u64, MathError> {
        let p = self.check(p)?;
        let scaled = u128::from(p.0) * u128::from(ratio.0) / u128::from(self.0);
        // p <= SCALE, so scaled <= ratio <= u32::MAX.
        u64::try_from(scaled).map_err(|_| MathError::OutOfRange {
            value: scaled,
            scale: self.0,
        })
    }

    fn narrow(self, value: u128) -> Result<Probability, MathError> {
        if value > u128::from(self.0) {
            return Err(MathError::OutOfRange {
                value,
                scale: self.0,
            });
        }
        // value <= self.0 <= u32::MAX
        Ok(Probability(value as u32))
    }
}

impl Default for Scale {
    fn default() -> Self {
        Scale::PERCENT
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A probability in scaled-integer form.
///
/// The type does not know its scale; values are validated against a [`Scale`]
/// whenever they enter arithmetic.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct Probability(u32);

impl Probability {
    pub const ZERO: Probability = Probability(0);

    pub const fn new(raw: u32) -> Self {
        Probability(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Probability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Probability> for u64 {
    fn from(p: Probability) -> Self {
        u64::from(p.0)
    }
}

/// A scaled likelihood ratio; `SCALE` represents 1.0 and values above `SCALE`
/// are legal.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct LikelihoodRatio(u32);

impl LikelihoodRatio {
    pub const fn new(raw: u32) -> Self {
        LikelihoodRatio(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for LikelihoodRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
