//! Congestion source abstraction
//!
//! A congestion source reports a single delay factor in [0, 1] describing
//! current traffic. Implementations absorb their own transport failures and
//! report the neutral value instead, so consumers never handle a fault.

use std::sync::atomic::{AtomicU64, Ordering};

/// Delay factor reported when the live signal is unavailable
pub const NEUTRAL_DELAY: f64 = 0.0;

/// Producer of a normalized live congestion signal
pub trait CongestionSource: Send + Sync {
    /// Current delay factor in [0, 1]. Must return [`NEUTRAL_DELAY`] on any
    /// failure rather than propagating it.
    fn current_delay(&self) -> f64;

    /// Source name for logs
    fn name(&self) -> &str {
        "congestion"
    }
}

/// Source that always reports free flow
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCongestion;

impl CongestionSource for NoCongestion {
    fn current_delay(&self) -> f64 {
        NEUTRAL_DELAY
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Source with a settable delay. Used for manual overrides and tests.
#[derive(Debug, Default)]
pub struct FixedCongestion {
    bits: AtomicU64,
}

impl FixedCongestion {
    pub fn new(delay: f64) -> Self {
        Self {
            bits: AtomicU64::new(clamp_delay(delay).to_bits()),
        }
    }

    pub fn set(&self, delay: f64) {
        self.bits
            .store(clamp_delay(delay).to_bits(), Ordering::Relaxed);
    }
}

impl CongestionSource for FixedCongestion {
    fn current_delay(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Bound a raw factor to [0, 1]; non-finite values become neutral
pub fn clamp_delay(delay: f64) -> f64 {
    if delay.is_finite() {
        delay.clamp(0.0, 1.0)
    } else {
        NEUTRAL_DELAY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_congestion_is_neutral() {
        assert_eq!(NoCongestion.current_delay(), 0.0);
    }

    #[test]
    fn test_fixed_congestion_clamps() {
        let source = FixedCongestion::new(0.4);
        assert_eq!(source.current_delay(), 0.4);

        source.set(3.0);
        assert_eq!(source.current_delay(), 1.0);

        source.set(f64::NAN);
        assert_eq!(source.current_delay(), 0.0);
    }

    #[test]
    fn test_sources_are_object_safe() {
        let sources: Vec<Box<dyn CongestionSource>> =
            vec![Box::new(NoCongestion), Box::new(FixedCongestion::new(0.25))];
        let total: f64 = sources.iter().map(|s| s.current_delay()).sum();
        assert_eq!(total, 0.25);
    }
}
