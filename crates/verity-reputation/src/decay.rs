// crates/verity-reputation/src/decay.rs
//
// Time-decay functions for accuracy history in the Verity network.
//
// Older evidence fades exponentially rather than vanishing abruptly or
// persisting forever: a record's influence is e^(-rate * age_in_days).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use verity_core::AccuracyRecord;

/// Default decay rate per day. Influence halves roughly every 14 days.
pub const DEFAULT_DECAY_RATE_PER_DAY: f64 = 0.05;

/// Accuracy factor reported when there is no usable history.
pub const NEUTRAL_ACCURACY: f64 = 500.0;

const MILLIS_PER_DAY: f64 = 24.0 * 60.0 * 60.0 * 1000.0;

/// Decay function for accuracy record attenuation over time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayFunction {
    /// Exponential rate per day (lambda). Negative values are treated as zero.
    pub rate_per_day: f64,
}

impl DecayFunction {
    pub fn new(rate_per_day: f64) -> Self {
        Self { rate_per_day }
    }

    /// Weight of a record that is `age_days` old: e^(-rate * age).
    ///
    /// Ages below zero (records stamped in the future) count as zero so a
    /// skewed clock can never give a record more than full weight.
    pub fn weight(&self, age_days: f64) -> f64 {
        let rate = if self.rate_per_day.is_finite() {
            self.rate_per_day.max(0.0)
        } else {
            0.0
        };
        let age = if age_days.is_finite() { age_days.max(0.0) } else { 0.0 };
        (-rate * age).exp()
    }

    /// Days after which a record carries half of its original weight.
    /// `None` when the rate is zero (no decay).
    pub fn half_life_days(&self) -> Option<f64> {
        if self.rate_per_day > 0.0 && self.rate_per_day.is_finite() {
            Some(std::f64::consts::LN_2 / self.rate_per_day)
        } else {
            None
        }
    }

    /// Decay-weighted average of the history's scores as of `now`.
    ///
    /// Returns 500 when the history is empty or every weight underflows.
    pub fn accuracy_factor(&self, history: &[AccuracyRecord], now: DateTime<Utc>) -> f64 {
        let mut total_weight = 0.0;
        let mut weighted_sum = 0.0;

        for record in history {
            let weight = self.weight(age_in_days(record.timestamp, now));
            weighted_sum += record.score.as_f64() * weight;
            total_weight += weight;
        }

        if total_weight > 0.0 {
            weighted_sum / total_weight
        } else {
            NEUTRAL_ACCURACY
        }
    }
}

impl Default for DecayFunction {
    fn default() -> Self {
        Self::new(DEFAULT_DECAY_RATE_PER_DAY)
    }
}

/// Fractional days elapsed from `at` to `now` (negative if `at` is later).
pub fn age_in_days(at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - at).num_milliseconds() as f64 / MILLIS_PER_DAY
}
