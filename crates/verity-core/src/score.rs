// crates/verity-core/src/score.rs
//
// Trust score primitives: the bounded score itself, historical accuracy
// records, and the factor weights used to combine them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bounded reputation value in [0, 1000].
///
/// Every constructor clamps, so a `TrustScore` can never leave its range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "u32")]
pub struct TrustScore(u32);

impl TrustScore {
    pub const MIN: TrustScore = TrustScore(0);
    pub const MAX: TrustScore = TrustScore(1000);
    /// Midpoint assigned to participants without history.
    pub const NEUTRAL: TrustScore = TrustScore(500);

    /// Create a score, clamping to [0, 1000].
    pub fn new(value: u32) -> Self {
        Self(value.min(Self::MAX.0))
    }

    /// Create a score from a signed value, clamping to [0, 1000].
    pub fn saturating_from_i64(value: i64) -> Self {
        Self(value.clamp(0, Self::MAX.0 as i64) as u32)
    }

    /// Create a score from a real value: rounds to nearest, clamps, and maps
    /// NaN to zero.
    pub fn from_f64(value: f64) -> Self {
        if value.is_nan() {
            return Self::MIN;
        }
        Self(value.round().clamp(0.0, Self::MAX.0 as f64) as u32)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64
    }

    /// Add a signed delta, saturating at the bounds.
    pub fn saturating_add_signed(self, delta: i64) -> Self {
        Self::saturating_from_i64(self.0 as i64 + delta)
    }
}

impl Default for TrustScore {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

impl fmt::Display for TrustScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TrustScore {
    fn from(value: i64) -> Self {
        Self::saturating_from_i64(value)
    }
}

impl From<TrustScore> for u32 {
    fn from(score: TrustScore) -> Self {
        score.0
    }
}

/// One historical data point for a participant's past correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccuracyRecord {
    pub timestamp: DateTime<Utc>,
    pub score: TrustScore,
}

impl AccuracyRecord {
    pub fn new(timestamp: DateTime<Utc>, score: TrustScore) -> Self {
        Self { timestamp, score }
    }
}

/// Relative importance of the three trust factors.
///
/// Weights are normalized before use; callers may pass any non-negative
/// triple. Negative or non-finite components count as zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrustWeights {
    pub accuracy: f64,
    pub consistency: f64,
    pub validation: f64,
}

impl TrustWeights {
    pub fn new(accuracy: f64, consistency: f64, validation: f64) -> Self {
        Self {
            accuracy,
            consistency,
            validation,
        }
    }

    /// Return weights scaled to sum to 1.0.
    ///
    /// Falls back to the defaults (0.6 / 0.2 / 0.2) when nothing positive
    /// remains after discarding negative and non-finite components.
    pub fn normalized(&self) -> TrustWeights {
        let sanitize = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
        let a = sanitize(self.accuracy);
        let c = sanitize(self.consistency);
        let v = sanitize(self.validation);
        let sum = a + c + v;
        if sum <= 0.0 || !sum.is_finite() {
            return TrustWeights::default();
        }
        TrustWeights::new(a / sum, c / sum, v / sum)
    }
}

impl Default for TrustWeights {
    fn default() -> Self {
        Self::new(0.6, 0.2, 0.2)
    }
}
