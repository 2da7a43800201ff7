// crates/verity-core/src/consensus.rs
//
// Consensus data model: validator opinions, round configuration, and the
// immutable result of aggregating a claim's opinion set.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::VerityError;
use crate::identity::ValidatorId;
use crate::score::TrustScore;

/// A single validator's verdict on a claim.
///
/// `trust_score` is the validator's score at the time of the vote. Later
/// reputation updates never change the weight of a historical opinion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opinion {
    pub validator_id: ValidatorId,
    pub result: bool,
    pub trust_score: TrustScore,
    pub timestamp: DateTime<Utc>,
    /// Opaque supporting evidence (a proof, a citation hash, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Vec<u8>>,
}

impl Opinion {
    pub fn new(
        validator_id: impl Into<ValidatorId>,
        result: bool,
        trust_score: TrustScore,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            validator_id: validator_id.into(),
            result,
            trust_score,
            timestamp,
            evidence: None,
        }
    }

    pub fn with_evidence(mut self, evidence: Vec<u8>) -> Self {
        self.evidence = Some(evidence);
        self
    }
}

/// Terminal state of a claim-validation round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusStatus {
    /// The weighted ratio reached the threshold.
    Accepted,
    /// Enough opinions arrived but the weighted ratio fell short.
    Rejected,
    /// Fewer opinions than `min_opinions`. Always reported as not accepted
    /// with zero weights and a zero ratio.
    Insufficient,
}

impl ConsensusStatus {
    /// Stable one-byte tag used in commitments.
    pub fn tag(self) -> u8 {
        match self {
            ConsensusStatus::Accepted => 1,
            ConsensusStatus::Rejected => 2,
            ConsensusStatus::Insufficient => 3,
        }
    }
}

impl std::fmt::Display for ConsensusStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsensusStatus::Accepted => write!(f, "Accepted"),
            ConsensusStatus::Rejected => write!(f, "Rejected"),
            ConsensusStatus::Insufficient => write!(f, "Insufficient"),
        }
    }
}

/// The outcome of aggregating one claim's opinions.
///
/// Never mutated after creation; re-aggregating a superset of opinions
/// produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub claim_id: String,
    pub status: ConsensusStatus,
    pub accepted: bool,
    pub weighted_for: u64,
    pub weighted_against: u64,
    /// weighted_for / (weighted_for + weighted_against), in [0, 1].
    pub ratio: f64,
    /// Opinions in canonical order (ascending validator id).
    pub opinions: Vec<Opinion>,
    /// Timestamp of the latest opinion considered; `None` for an empty round.
    pub decided_at: Option<DateTime<Utc>>,
}

impl ConsensusResult {
    pub fn is_insufficient(&self) -> bool {
        self.status == ConsensusStatus::Insufficient
    }

    /// Whether the given opinion sided with the outcome. `None` for
    /// insufficient rounds, where there is no outcome to agree with.
    pub fn agrees(&self, opinion: &Opinion) -> Option<bool> {
        if self.is_insufficient() {
            None
        } else {
            Some(opinion.result == self.accepted)
        }
    }
}

/// Per-round consensus parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusConfig {
    /// Minimum number of opinions for a decision (>= 1). Default: 3.
    pub min_opinions: usize,
    /// Fraction of trust-weighted votes needed to accept, in (0, 1]. Default: 0.66.
    pub threshold: f64,
    /// Global collection deadline for a fan-out round. Default: 30s.
    pub timeout: Duration,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            min_opinions: 3,
            threshold: 0.66,
            timeout: Duration::from_secs(30),
        }
    }
}

impl ConsensusConfig {
    /// Reject configurations outside the documented ranges.
    pub fn validate(&self) -> Result<(), VerityError> {
        if self.min_opinions == 0 {
            return Err(VerityError::invalid("min_opinions must be at least 1"));
        }
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(VerityError::invalid(format!(
                "threshold must be in (0, 1], got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// A request to collect opinions on a claim from a set of validators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRequest {
    pub claim_id: String,
    pub validators: Vec<ValidatorId>,
    /// Claim content or a reference to it, forwarded verbatim to validators.
    #[serde(default)]
    pub payload: Vec<u8>,
}

impl ValidationRequest {
    pub fn new(claim_id: impl Into<String>, validators: Vec<ValidatorId>) -> Self {
        Self {
            claim_id: claim_id.into(),
            validators,
            payload: Vec::new(),
        }
    }

    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    /// Check the required fields before any work begins.
    pub fn validate(&self) -> Result<(), VerityError> {
        if self.claim_id.trim().is_empty() {
            return Err(VerityError::invalid("claim id is required"));
        }
        if self.validators.is_empty() {
            return Err(VerityError::invalid("validator list is empty"));
        }
        if let Some(id) = self.validators.iter().find(|id| id.is_empty()) {
            return Err(VerityError::invalid(format!("empty validator id: {:?}", id.as_str())));
        }
        Ok(())
    }
}
