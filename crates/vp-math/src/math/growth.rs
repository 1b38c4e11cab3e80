//! Exponential growth counters.

/// `2^exponent`, or `None` once the result no longer fits in a `u64`.
pub fn checked_pow2(exponent: u64) -> Option<u64> {
    if exponent >= u64::from(u64::BITS) {
        return None;
    }
    Some(1u64 << exponent)
}

/// `2^exponent`, capped at `u64::MAX`.
pub fn saturating_pow2(exponent: u64) -> u64 {
    checked_pow2(exponent).unwrap_or(u64::MAX)
}
