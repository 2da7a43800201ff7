// crates/verity-core/src/telemetry.rs
//
// Telemetry port for the engines. Each engine is handed an `Arc<dyn Telemetry>`
// at construction instead of logging through ambient state, so tests can
// observe exactly what an engine reported.

use std::sync::Mutex;

use crate::consensus::ConsensusStatus;
use crate::identity::{ParticipantId, ValidatorId};
use crate::score::TrustScore;

/// Something an engine wants the outside world to know about.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A full trust recompute finished.
    ScoreRecomputed {
        participant: Option<ParticipantId>,
        previous: TrustScore,
        updated: TrustScore,
    },
    /// An incremental blend was applied outside the full recompute path.
    ScoreNudged {
        participant: ParticipantId,
        previous: TrustScore,
        updated: TrustScore,
    },
    /// A computation hit degenerate inputs and returned its fallback.
    DegenerateComputation {
        operation: &'static str,
        detail: String,
    },
    /// A validator's opinion was left out of a round.
    OpinionDropped {
        claim_id: String,
        validator_id: ValidatorId,
        reason: String,
    },
    /// Collection for a fan-out round stopped.
    RoundClosed {
        claim_id: String,
        requested: usize,
        received: usize,
        timed_out: bool,
    },
    /// A round reached a terminal state.
    ConsensusDecided {
        claim_id: String,
        status: ConsensusStatus,
        ratio: f64,
    },
    /// A validator pair voted in suspicious lockstep.
    CollusionSuspected {
        first: ValidatorId,
        second: ValidatorId,
        correlation: f64,
        shared_claims: usize,
    },
}

/// Sink for engine events.
pub trait Telemetry: Send + Sync {
    fn record(&self, event: EngineEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn record(&self, event: EngineEvent) {
        match event {
            EngineEvent::ScoreRecomputed {
                participant,
                previous,
                updated,
            } => {
                tracing::debug!(
                    participant = participant.as_ref().map(|p| p.as_str()).unwrap_or("-"),
                    %previous,
                    %updated,
                    "trust score recomputed"
                );
            }
            EngineEvent::ScoreNudged {
                participant,
                previous,
                updated,
            } => {
                tracing::debug!(%participant, %previous, %updated, "trust score nudged");
            }
            EngineEvent::DegenerateComputation { operation, detail } => {
                tracing::warn!(operation, "degenerate input, using fallback: {}", detail);
            }
            EngineEvent::OpinionDropped {
                claim_id,
                validator_id,
                reason,
            } => {
                tracing::warn!(%claim_id, %validator_id, "opinion dropped: {}", reason);
            }
            EngineEvent::RoundClosed {
                claim_id,
                requested,
                received,
                timed_out,
            } => {
                tracing::info!(%claim_id, requested, received, timed_out, "collection closed");
            }
            EngineEvent::ConsensusDecided {
                claim_id,
                status,
                ratio,
            } => {
                tracing::info!(%claim_id, %status, ratio, "consensus decided");
            }
            EngineEvent::CollusionSuspected {
                first,
                second,
                correlation,
                shared_claims,
            } => {
                tracing::warn!(
                    %first,
                    %second,
                    correlation,
                    shared_claims,
                    "correlated voting detected"
                );
            }
        }
    }
}

/// Keeps every event in memory. Used by tests to assert on engine behavior.
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events recorded so far.
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Telemetry for RecordingTelemetry {
    fn record(&self, event: EngineEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}
