//! Device risk signal sources

use rand::{Rng, RngCore};

/// Source of the per-transaction device risk signal.
///
/// Implementations must return a value in [0, 1]. The random source is
/// passed through so simulated providers stay reproducible under a seed.
pub trait RiskSignalProvider: Send + Sync {
    fn device_score(&self, identity: &str, rng: &mut dyn RngCore) -> f64;

    fn name(&self) -> &'static str;
}

/// Simulated device signal: uniform in `[min, max]`, rounded to 2 decimals.
///
/// Stands in for a real device-reputation feed.
#[derive(Debug, Clone)]
pub struct SimulatedDeviceSignal {
    min: f64,
    max: f64,
}

impl SimulatedDeviceSignal {
    pub const DEFAULT_MIN: f64 = 0.05;
    pub const DEFAULT_MAX: f64 = 0.95;

    pub fn new() -> Self {
        Self {
            min: Self::DEFAULT_MIN,
            max: Self::DEFAULT_MAX,
        }
    }

    /// Custom range, clamped into [0, 1]
    pub fn with_range(min: f64, max: f64) -> Self {
        let min = min.clamp(0.0, 1.0);
        let max = max.clamp(min, 1.0);
        Self { min, max }
    }

    pub fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}

impl Default for SimulatedDeviceSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl RiskSignalProvider for SimulatedDeviceSignal {
    fn device_score(&self, _identity: &str, rng: &mut dyn RngCore) -> f64 {
        let raw = self.min + rng.gen::<f64>() * (self.max - self.min);
        // Rounding can land a hair outside the bounds of a non-2-decimal range
        round_to(raw, 2).clamp(self.min, self.max)
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

/// Fixed signal, for replaying a known device score
#[derive(Debug, Clone, Copy)]
pub struct FixedDeviceSignal(pub f64);

impl RiskSignalProvider for FixedDeviceSignal {
    fn device_score(&self, _identity: &str, _rng: &mut dyn RngCore) -> f64 {
        self.0.clamp(0.0, 1.0)
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Round half away from zero to `digits` decimal places
pub(crate) fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}
