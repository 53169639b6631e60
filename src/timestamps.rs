// src/timestamps.rs
//
// Fractional sample points through a recording. Both recordings are
// sampled at the same fractions so phases line up by relative progress,
// not wall-clock time.

use serde::Serialize;
use thiserror::Error;

/// The sample points used for a technique comparison: early, middle, late.
pub const STANDARD_FRACTIONS: [f64; 3] = [0.25, 0.5, 0.75];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampSetError {
    #[error("timestamp set is empty")]
    Empty,
    #[error("fraction {0} is outside [0, 1]")]
    OutOfRange(f64),
    #[error("fractions must be strictly ascending ({prev} then {next})")]
    NotAscending { prev: f64, next: f64 },
    #[error("expected {expected} fractions, one per phase, got {actual}")]
    PhaseCount { expected: usize, actual: usize },
}

/// Non-empty, strictly ascending fractions in `[0, 1]`. A fraction of 1.0
/// names the final instant; backends decode the last frame before it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimestampSet {
    fractions: Vec<f64>,
}

impl TimestampSet {
    pub fn new(fractions: Vec<f64>) -> Result<Self, TimestampSetError> {
        if fractions.is_empty() {
            return Err(TimestampSetError::Empty);
        }
        for &f in &fractions {
            if !(0.0..=1.0).contains(&f) {
                return Err(TimestampSetError::OutOfRange(f));
            }
        }
        for pair in fractions.windows(2) {
            if pair[1] <= pair[0] {
                return Err(TimestampSetError::NotAscending {
                    prev: pair[0],
                    next: pair[1],
                });
            }
        }
        Ok(Self { fractions })
    }

    pub fn standard() -> Self {
        Self {
            fractions: STANDARD_FRACTIONS.to_vec(),
        }
    }

    pub fn fractions(&self) -> &[f64] {
        &self.fractions
    }

    pub fn len(&self) -> usize {
        self.fractions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fractions.is_empty()
    }

    /// Absolute seconds for a recording of `duration_seconds`.
    pub fn absolute_seconds(&self, duration_seconds: f64) -> Vec<f64> {
        self.fractions
            .iter()
            .map(|f| round_to_hundredths(f * duration_seconds))
            .collect()
    }
}

impl Default for TimestampSet {
    fn default() -> Self {
        Self::standard()
    }
}

/// Two decimal places keeps derived seconds comparable across runs.
pub fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
