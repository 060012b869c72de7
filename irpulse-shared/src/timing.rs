//! Timing primitives shared by the codec and the capture state machine.
//!
//! All durations are microseconds. Every pulse-length comparison in the
//! decoder goes through [`within_tolerance`] so the accepted jitter band is
//! defined in exactly one place.

/// Base time unit of the AEHA format.
pub const T_AEHA: u32 = 425;
/// Base time unit of the NEC format.
pub const T_NEC: u32 = 560;
/// Base time unit of the SONY format.
pub const T_SONY: u32 = 600;

/// Inter-frame wait used by AEHA encoding and by the stop-bit heuristic
/// when decoding.
pub const T_WAIT: u32 = 10_000;

/// Default inter-edge gap above which a capture is considered finished.
pub const DEFAULT_MAX_GAP: u32 = 30_000;

/// Default fraction of the target length accepted by [`within_tolerance`].
pub const DEFAULT_TOLERANCE: f64 = 0.35;

/// Round `n` to the nearest multiple of `m`, ties rounding up.
pub fn round_to(n: u32, m: u32) -> u32 {
    (n + m / 2) / m * m
}

/// True iff `length` lies strictly inside `target * (1 ± tol)`.
///
/// A value exactly on either boundary is rejected.
pub fn within_tolerance(length: u32, target: u32, tol: f64) -> bool {
    let length = f64::from(length);
    let target = f64::from(target);
    length > target * (1.0 - tol) && length < target * (1.0 + tol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_ties_up() {
        assert_eq!(round_to(1005, 10), 1010);
        assert_eq!(round_to(1004, 10), 1000);
        assert_eq!(round_to(425, 50), 450);
        assert_eq!(round_to(0, 200), 0);
    }

    #[test]
    fn tolerance_bounds_are_strict() {
        // 1000 * (1 - 0.35) = 650 exactly
        assert!(!within_tolerance(650, 1000, 0.35));
        assert!(!within_tolerance(1350, 1000, 0.35));
        assert!(within_tolerance(651, 1000, 0.35));
        assert!(within_tolerance(1349, 1000, 0.35));
        assert!(within_tolerance(1000, 1000, 0.35));
    }

    #[test]
    fn tolerance_rejects_far_values() {
        assert!(!within_tolerance(100, 1000, 0.35));
        assert!(!within_tolerance(2000, 1000, 0.35));
    }
}
