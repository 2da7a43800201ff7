// crates/verity-reputation/src/engine.rs
//
// Reputation Engine: turns raw evidence into a bounded trust score and
// exposes the incremental update and trend-prediction operations.
//
// Every operation is synchronous and side-effect free apart from telemetry.
// The only ambient input is "now", read from the injected clock.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use verity_core::{
    AccuracyRecord, Clock, EngineEvent, ParticipantId, SystemClock, Telemetry, TracingTelemetry,
    TrustScore, TrustWeights,
};

use crate::decay::{age_in_days, DecayFunction, DEFAULT_DECAY_RATE_PER_DAY};
use crate::math::{blend, consistency_delta, linear_regression};

/// Step applied to the validation rate after a successful validation.
pub const VALIDATION_REWARD: i64 = 10;
/// Step applied after a failed validation. Twice the reward.
pub const VALIDATION_PENALTY: i64 = 20;
/// Minimum history length for a regression-based trend.
pub const MIN_TREND_POINTS: usize = 3;

/// Tunables for the Reputation Engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationConfig {
    /// Exponential decay rate per day for accuracy history. Default: 0.05.
    pub decay_rate_per_day: f64,
    /// Factor weights for the full recompute. Default: 0.6 / 0.2 / 0.2.
    pub weights: TrustWeights,
    /// Blend weight for incremental nudges. Default: 0.1.
    pub nudge_weight: f64,
    /// Default horizon for trend prediction, in days. Default: 30.
    pub trend_days_ahead: f64,
    /// Keep at most this many accuracy records per participant (oldest are
    /// dropped first). `None` keeps everything.
    pub max_history: Option<usize>,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            decay_rate_per_day: DEFAULT_DECAY_RATE_PER_DAY,
            weights: TrustWeights::default(),
            nudge_weight: 0.1,
            trend_days_ahead: 30.0,
            max_history: None,
        }
    }
}

/// Why a trend prediction returned the last known score instead of a projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendFallback {
    /// Fewer than three history points.
    InsufficientHistory { points: usize },
    /// The regression could not be fitted (e.g. all timestamps identical).
    Degenerate,
}

/// Result of `predict_trend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPrediction {
    pub score: TrustScore,
    /// Set when `score` is a fallback rather than a fitted projection.
    pub fallback: Option<TrendFallback>,
}

impl TrendPrediction {
    pub fn is_projection(&self) -> bool {
        self.fallback.is_none()
    }
}

/// Trust scoring formulas with their collaborators.
pub struct ReputationEngine {
    config: ReputationConfig,
    decay: DecayFunction,
    clock: Arc<dyn Clock>,
    telemetry: Arc<dyn Telemetry>,
}

impl std::fmt::Debug for ReputationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReputationEngine")
            .field("config", &self.config)
            .finish()
    }
}

impl ReputationEngine {
    /// Create an engine with explicit collaborators.
    pub fn new(
        config: ReputationConfig,
        clock: Arc<dyn Clock>,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        let decay = DecayFunction::new(config.decay_rate_per_day);
        Self {
            config,
            decay,
            clock,
            telemetry,
        }
    }

    /// Engine on the wall clock, logging through `tracing`.
    pub fn with_defaults(config: ReputationConfig) -> Self {
        Self::new(config, Arc::new(SystemClock), Arc::new(TracingTelemetry))
    }

    pub fn config(&self) -> &ReputationConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn telemetry(&self) -> &Arc<dyn Telemetry> {
        &self.telemetry
    }

    /// Decay-weighted accuracy factor of `history` as of now. 500 when empty.
    pub fn accuracy_factor(&self, history: &[AccuracyRecord]) -> f64 {
        self.decay.accuracy_factor(history, self.clock.now())
    }

    /// Combine the three trust factors into a bounded score.
    ///
    /// `base` is the participant's current score; it does not enter the
    /// formula and is only reported alongside the result.
    pub fn calculate_trust_score(
        &self,
        base: TrustScore,
        accuracy_history: &[AccuracyRecord],
        consistency_factor: TrustScore,
        validation_rate: TrustScore,
        weights: &TrustWeights,
    ) -> TrustScore {
        self.score_for(
            None,
            base,
            accuracy_history,
            consistency_factor,
            validation_rate,
            weights,
        )
    }

    pub(crate) fn score_for(
        &self,
        participant: Option<&ParticipantId>,
        base: TrustScore,
        accuracy_history: &[AccuracyRecord],
        consistency_factor: TrustScore,
        validation_rate: TrustScore,
        weights: &TrustWeights,
    ) -> TrustScore {
        let w = weights.normalized();
        let accuracy = self.accuracy_factor(accuracy_history);

        let total = (accuracy * w.accuracy).round()
            + (consistency_factor.as_f64() * w.consistency).round()
            + (validation_rate.as_f64() * w.validation).round();
        let updated = TrustScore::from_f64(total);

        self.telemetry.record(EngineEvent::ScoreRecomputed {
            participant: participant.cloned(),
            previous: base,
            updated,
        });
        updated
    }

    /// Blend `current` toward `new_evidence` by `weight` (clamped to [0, 1]).
    pub fn update_trust_score(
        &self,
        current: TrustScore,
        new_evidence: TrustScore,
        weight: f64,
    ) -> TrustScore {
        TrustScore::from_f64(blend(current.as_f64(), new_evidence.as_f64(), weight))
    }

    /// `update_trust_score` with the configured nudge weight (0.1 by default).
    pub fn nudge(&self, current: TrustScore, new_evidence: TrustScore) -> TrustScore {
        self.update_trust_score(current, new_evidence, self.config.nudge_weight)
    }

    /// Move the consistency factor by the logistic delta between two
    /// consecutive submission scores.
    pub fn update_consistency_factor(
        &self,
        current: TrustScore,
        new_submission_score: TrustScore,
        previous_submission_score: TrustScore,
    ) -> TrustScore {
        let delta = consistency_delta(
            new_submission_score.value(),
            previous_submission_score.value(),
        );
        current.saturating_add_signed(delta)
    }

    /// +10 on success, -20 on failure.
    pub fn update_validation_rate(&self, current: TrustScore, is_validated: bool) -> TrustScore {
        if is_validated {
            current.saturating_add_signed(VALIDATION_REWARD)
        } else {
            current.saturating_add_signed(-VALIDATION_PENALTY)
        }
    }

    /// Project the score `days_ahead` days past now with a least-squares line
    /// over the history.
    ///
    /// Never fails: short or degenerate histories return the most recent
    /// score (500 for an empty history) with the reason in `fallback`.
    pub fn predict_trend(&self, history: &[AccuracyRecord], days_ahead: f64) -> TrendPrediction {
        let mut ordered: Vec<AccuracyRecord> = history.to_vec();
        ordered.sort_by_key(|r| r.timestamp);

        let last_known = ordered
            .last()
            .map(|r| r.score)
            .unwrap_or(TrustScore::NEUTRAL);

        if ordered.len() < MIN_TREND_POINTS {
            return TrendPrediction {
                score: last_known,
                fallback: Some(TrendFallback::InsufficientHistory {
                    points: ordered.len(),
                }),
            };
        }

        // x axis: days since the earliest record, which keeps the fit well
        // conditioned regardless of the absolute epoch.
        let origin = ordered[0].timestamp;
        let points: Vec<(f64, f64)> = ordered
            .iter()
            .map(|r| (age_in_days(origin, r.timestamp), r.score.as_f64()))
            .collect();

        let horizon = if days_ahead.is_finite() { days_ahead } else { 0.0 };
        let Some(target) = self.horizon_target(horizon) else {
            return self.degenerate_trend(
                last_known,
                format!("horizon of {} days is outside the representable range", horizon),
            );
        };
        let target_x = age_in_days(origin, target);

        match linear_regression(&points).map(|fit| fit.evaluate(target_x)) {
            Some(projected) if projected.is_finite() => TrendPrediction {
                score: TrustScore::from_f64(projected),
                fallback: None,
            },
            _ => self.degenerate_trend(
                last_known,
                format!(
                    "regression over {} points could not be fitted",
                    ordered.len()
                ),
            ),
        }
    }

    /// `now + days`, or `None` when the instant falls outside chrono's range.
    fn horizon_target(&self, days: f64) -> Option<DateTime<Utc>> {
        let millis = (days * 86_400_000.0).round();
        if !(i64::MIN as f64..=i64::MAX as f64).contains(&millis) {
            return None;
        }
        let offset = Duration::try_milliseconds(millis as i64)?;
        self.clock.now().checked_add_signed(offset)
    }

    fn degenerate_trend(&self, last_known: TrustScore, detail: String) -> TrendPrediction {
        self.telemetry.record(EngineEvent::DegenerateComputation {
            operation: "predict_trend",
            detail,
        });
        TrendPrediction {
            score: last_known,
            fallback: Some(TrendFallback::Degenerate),
        }
    }

    /// `predict_trend` over the configured horizon (30 days by default).
    pub fn predict_trend_default(&self, history: &[AccuracyRecord]) -> TrendPrediction {
        self.predict_trend(history, self.config.trend_days_ahead)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use verity_core::{FixedClock, RecordingTelemetry};

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
    }

    fn engine_at(now: DateTime<Utc>) -> (ReputationEngine, Arc<RecordingTelemetry>) {
        let telemetry = Arc::new(RecordingTelemetry::new());
        let engine = ReputationEngine::new(
            ReputationConfig::default(),
            Arc::new(FixedClock::new(now)),
            telemetry.clone(),
        );
        (engine, telemetry)
    }

    fn record(days_before: i64, score: u32) -> AccuracyRecord {
        AccuracyRecord::new(epoch() - Duration::days(days_before), TrustScore::new(score))
    }

    #[test]
    fn empty_history_uses_neutral_accuracy() {
        let (engine, _) = engine_at(epoch());
        let score = engine.calculate_trust_score(
            TrustScore::NEUTRAL,
            &[],
            TrustScore::new(500),
            TrustScore::new(500),
            &TrustWeights::default(),
        );
        // 300 + 100 + 100
        assert_eq!(score.value(), 500);
    }

    #[test]
    fn weighted_components_are_rounded_separately() {
        let (engine, _) = engine_at(epoch());
        let history = vec![record(0, 801)];
        let score = engine.calculate_trust_score(
            TrustScore::NEUTRAL,
            &history,
            TrustScore::new(333),
            TrustScore::new(777),
            &TrustWeights::default(),
        );
        // round(480.6) + round(66.6) + round(155.4) = 481 + 67 + 155
        assert_eq!(score.value(), 703);
    }

    #[test]
    fn score_stays_bounded_for_extreme_weights() {
        let (engine, _) = engine_at(epoch());
        let history = vec![record(0, 1000), record(5, 1000)];
        let max = TrustScore::MAX;
        for weights in [
            TrustWeights::new(1.0, 0.0, 0.0),
            TrustWeights::new(0.0, 1.0, 0.0),
            TrustWeights::new(0.0, 0.0, 1.0),
            TrustWeights::new(0.0, 0.0, 0.0),
            TrustWeights::new(-4.0, -1.0, -9.0),
            TrustWeights::new(1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0),
            TrustWeights::new(1e300, 1e300, 1e300),
        ] {
            let s = engine.calculate_trust_score(max, &history, max, max, &weights);
            assert!(s <= TrustScore::MAX, "{:?} gave {}", weights, s);
            let s = engine.calculate_trust_score(
                TrustScore::MIN,
                &[],
                TrustScore::MIN,
                TrustScore::MIN,
                &weights,
            );
            assert!(s >= TrustScore::MIN);
        }
    }

    #[test]
    fn all_on_accuracy_tracks_accuracy_factor() {
        let (engine, _) = engine_at(epoch());
        let history = vec![record(0, 900)];
        let s = engine.calculate_trust_score(
            TrustScore::NEUTRAL,
            &history,
            TrustScore::MIN,
            TrustScore::MIN,
            &TrustWeights::new(5.0, 0.0, 0.0),
        );
        assert_eq!(s.value(), 900);
    }

    #[test]
    fn fresh_record_contributes_more_than_month_old_one() {
        let (engine, _) = engine_at(epoch());
        let fresh_high = vec![record(30, 0), record(0, 1000)];
        let stale_high = vec![record(0, 0), record(30, 1000)];
        assert!(engine.accuracy_factor(&fresh_high) > engine.accuracy_factor(&stale_high));
        assert!(engine.accuracy_factor(&fresh_high) > 500.0);
        assert!(engine.accuracy_factor(&stale_high) < 500.0);
    }

    #[test]
    fn recompute_is_reported() {
        let (engine, telemetry) = engine_at(epoch());
        engine.calculate_trust_score(
            TrustScore::new(100),
            &[],
            TrustScore::NEUTRAL,
            TrustScore::NEUTRAL,
            &TrustWeights::default(),
        );
        assert_eq!(
            telemetry.events(),
            vec![EngineEvent::ScoreRecomputed {
                participant: None,
                previous: TrustScore::new(100),
                updated: TrustScore::new(500),
            }]
        );
    }

    #[test]
    fn update_toward_same_value_is_noop() {
        let (engine, _) = engine_at(epoch());
        for s in [0, 1, 499, 500, 999, 1000] {
            for w in [0.0, 0.1, 0.5, 1.0, 3.0] {
                let score = TrustScore::new(s);
                assert_eq!(engine.update_trust_score(score, score, w), score);
            }
        }
    }

    #[test]
    fn update_trust_score_blends_and_clamps_weight() {
        let (engine, _) = engine_at(epoch());
        let s = engine.update_trust_score(TrustScore::new(500), TrustScore::new(1000), 0.1);
        assert_eq!(s.value(), 550);
        let s = engine.update_trust_score(TrustScore::new(500), TrustScore::new(1000), 4.0);
        assert_eq!(s.value(), 1000);
        assert_eq!(engine.nudge(TrustScore::new(800), TrustScore::MIN).value(), 720);
    }

    #[test]
    fn consistency_rises_for_stable_submissions_and_falls_for_erratic_ones() {
        let (engine, _) = engine_at(epoch());
        let stable = engine.update_consistency_factor(
            TrustScore::new(500),
            TrustScore::new(710),
            TrustScore::new(700),
        );
        assert!(stable.value() > 500);

        let erratic = engine.update_consistency_factor(
            TrustScore::new(500),
            TrustScore::new(950),
            TrustScore::new(50),
        );
        assert!(erratic.value() < 500);

        let capped = engine.update_consistency_factor(
            TrustScore::new(980),
            TrustScore::new(600),
            TrustScore::new(600),
        );
        assert_eq!(capped, TrustScore::MAX);
    }

    #[test]
    fn validation_rate_steps_are_asymmetric() {
        let (engine, _) = engine_at(epoch());
        assert_eq!(engine.update_validation_rate(TrustScore::new(500), true).value(), 510);
        assert_eq!(engine.update_validation_rate(TrustScore::new(500), false).value(), 480);
        assert_eq!(engine.update_validation_rate(TrustScore::new(995), true), TrustScore::MAX);
        assert_eq!(engine.update_validation_rate(TrustScore::new(15), false), TrustScore::MIN);
    }

    #[test]
    fn trend_with_empty_history_is_neutral() {
        let (engine, _) = engine_at(epoch());
        let p = engine.predict_trend(&[], 30.0);
        assert_eq!(p.score, TrustScore::NEUTRAL);
        assert_eq!(p.fallback, Some(TrendFallback::InsufficientHistory { points: 0 }));
    }

    #[test]
    fn trend_with_two_points_returns_latest_score() {
        let (engine, _) = engine_at(epoch());
        // Passed out of order on purpose: "latest" means latest timestamp.
        let history = vec![record(1, 900), record(10, 100)];
        let p = engine.predict_trend(&history, 30.0);
        assert_eq!(p.score.value(), 900);
        assert!(!p.is_projection());
    }

    #[test]
    fn trend_projects_linear_growth() {
        let (engine, _) = engine_at(epoch());
        // +10 per day, reaching 600 today
        let history = vec![record(20, 400), record(10, 500), record(0, 600)];
        let p = engine.predict_trend(&history, 30.0);
        assert!(p.is_projection());
        assert_eq!(p.score.value(), 900);
    }

    #[test]
    fn trend_projection_is_clamped() {
        let (engine, _) = engine_at(epoch());
        let history = vec![record(2, 800), record(1, 900), record(0, 1000)];
        let p = engine.predict_trend(&history, 30.0);
        assert_eq!(p.score, TrustScore::MAX);

        let falling = vec![record(2, 200), record(1, 100), record(0, 0)];
        assert_eq!(engine.predict_trend(&falling, 30.0).score, TrustScore::MIN);
    }

    #[test]
    fn trend_with_identical_timestamps_falls_back() {
        let (engine, telemetry) = engine_at(epoch());
        let history = vec![record(3, 200), record(3, 400), record(3, 700)];
        let p = engine.predict_trend(&history, 30.0);
        assert_eq!(p.fallback, Some(TrendFallback::Degenerate));
        assert_eq!(p.score.value(), 700);
        assert!(telemetry.events().iter().any(|e| matches!(
            e,
            EngineEvent::DegenerateComputation { operation: "predict_trend", .. }
        )));
    }

    #[test]
    fn horizon_past_the_calendar_falls_back_to_latest_score() {
        let (engine, telemetry) = engine_at(epoch());
        let history = vec![record(20, 400), record(10, 500), record(0, 600)];
        for days in [1e9, -1e9, 1e300] {
            let p = engine.predict_trend(&history, days);
            assert_eq!(p.fallback, Some(TrendFallback::Degenerate));
            assert_eq!(p.score.value(), 600);
        }
        assert_eq!(telemetry.events().len(), 3);
    }
}
