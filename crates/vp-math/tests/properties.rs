//! Property-based tests for vp-math fixed-point operations.
//!
//! Uses proptest to verify arithmetic properties hold across many random inputs.

use proptest::prelude::*;
use vp_math::{checked_pow2, saturating_pow2, LikelihoodRatio, Probability, Scale};

fn scale_strategy() -> impl Strategy<Value = Scale> {
    prop_oneof![
        Just(Scale::PERCENT),
        Just(Scale::BASIS_POINTS),
        (1u32..=1_000_000u32).prop_map(|raw| Scale::new(raw).unwrap()),
    ]
}

fn scale_and_pair() -> impl Strategy<Value = (Scale, Probability, Probability)> {
    scale_strategy().prop_flat_map(|s| {
        let max = s.get();
        (
            Just(s),
            (0..=max).prop_map(Probability::new),
            (0..=max).prop_map(Probability::new),
        )
    })
}

// ============================================================================
// multiply
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2000))]

    /// Multiplication is commutative.
    #[test]
    fn multiply_commutative((s, a, b) in scale_and_pair()) {
        prop_assert_eq!(s.multiply(a, b).unwrap(), s.multiply(b, a).unwrap());
    }

    /// The product never exceeds either factor.
    #[test]
    fn multiply_bounded_by_factors((s, a, b) in scale_and_pair()) {
        let out = s.multiply(a, b).unwrap();
        prop_assert!(out <= a);
        prop_assert!(out <= b);
    }

    /// The result matches the reference formula exactly.
    #[test]
    fn multiply_matches_reference((s, a, b) in scale_and_pair()) {
        let expected = (u64::from(a) * u64::from(b)) / u64::from(s.get());
        prop_assert_eq!(u64::from(s.multiply(a, b).unwrap()), expected);
    }

    /// Multiplying by one is the identity.
    #[test]
    fn multiply_by_one((s, a, _b) in scale_and_pair()) {
        prop_assert_eq!(s.multiply(a, s.one()).unwrap(), a);
    }
}

// ============================================================================
// complement
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2000))]

    /// complement(complement(a)) == a.
    #[test]
    fn complement_involution((s, a, _b) in scale_and_pair()) {
        let once = s.complement(a).unwrap();
        prop_assert_eq!(s.complement(once).unwrap(), a);
    }

    /// a + complement(a) == SCALE.
    #[test]
    fn complement_sums_to_one((s, a, _b) in scale_and_pair()) {
        let c = s.complement(a).unwrap();
        prop_assert_eq!(a.raw() + c.raw(), s.get());
    }

    /// Out-of-range inputs are always rejected.
    #[test]
    fn out_of_range_rejected(s in scale_strategy(), excess in 1u32..1000) {
        let bad = Probability::new(s.get().saturating_add(excess));
        prop_assume!(bad.raw() > s.get());
        prop_assert!(s.complement(bad).is_err());
        prop_assert!(s.multiply(bad, s.one()).is_err());
    }
}

// ============================================================================
// divide / scale_ratio
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2000))]

    /// part * SCALE / whole stays in range whenever part <= whole.
    #[test]
    fn divide_share_in_range(s in scale_strategy(), whole in 1u64..1_000_000, frac in 0.0f64..=1.0) {
        let part = ((whole as f64) * frac).floor() as u64;
        let part = part.min(whole);
        let out = s.divide(part, whole).unwrap();
        prop_assert!(out.raw() <= s.get());
    }

    /// Two complementary shares lose at most one unit to truncation.
    #[test]
    fn divide_complementary_shares(s in scale_strategy(), a in 0u64..100_000, b in 0u64..100_000) {
        prop_assume!(a + b > 0);
        let pa = s.divide(a, a + b).unwrap();
        let pb = s.divide(b, a + b).unwrap();
        let sum = u64::from(pa) + u64::from(pb);
        prop_assert!(sum == u64::from(s.get()) || sum + 1 == u64::from(s.get()), "sum={}", sum);
    }

    /// The neutral ratio leaves any probability unchanged.
    #[test]
    fn neutral_ratio_is_identity((s, a, _b) in scale_and_pair()) {
        prop_assert_eq!(s.scale_ratio(a, s.neutral_ratio()).unwrap(), u64::from(a));
    }

    /// Scaling by a ratio is monotone in the ratio.
    #[test]
    fn scale_ratio_monotone((s, a, _b) in scale_and_pair(), r1 in 0u32..1_000_000, r2 in 0u32..1_000_000) {
        let (lo, hi) = if r1 <= r2 { (r1, r2) } else { (r2, r1) };
        let out_lo = s.scale_ratio(a, LikelihoodRatio::new(lo)).unwrap();
        let out_hi = s.scale_ratio(a, LikelihoodRatio::new(hi)).unwrap();
        prop_assert!(out_lo <= out_hi);
    }
}

// ============================================================================
// growth counters
// ============================================================================

proptest! {
    /// 2^k doubles with every step below the overflow boundary.
    #[test]
    fn pow2_doubles(k in 0u64..63) {
        prop_assert_eq!(checked_pow2(k + 1).unwrap(), checked_pow2(k).unwrap() * 2);
    }

    /// Saturation kicks in exactly at 64.
    #[test]
    fn pow2_saturates(k in 64u64..10_000) {
        prop_assert_eq!(checked_pow2(k), None);
        prop_assert_eq!(saturating_pow2(k), u64::MAX);
    }
}
