// crates/verity-consensus/src/round.rs
//
// Claim-validation round lifecycle for the Verity network.
//
// A round collects opinions for one claim, then closes into a terminal
// consensus result. Lifecycle: Collecting -> Aggregated(Accepted | Rejected |
// Insufficient). The opinion set is append-only while collecting and frozen
// once the round is aggregated.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use verity_core::{
    ConsensusConfig, ConsensusResult, ConsensusStatus, Opinion, ValidatorId, VerityError,
};

use crate::aggregate::aggregate_validations;

/// The current phase of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    /// Opinions are still being accepted.
    Collecting,
    /// Collection is closed and the outcome is final.
    Aggregated(ConsensusStatus),
}

/// One claim's validation round.
#[derive(Debug, Clone)]
pub struct ValidationRound {
    claim_id: String,
    config: ConsensusConfig,
    opinions: Vec<Opinion>,
    voters: HashSet<ValidatorId>,
    phase: RoundPhase,
    result: Option<ConsensusResult>,
}

impl ValidationRound {
    /// Open a round for `claim_id`.
    ///
    /// Fails with `InputValidation` for an empty claim id or invalid config.
    pub fn open(claim_id: impl Into<String>, config: ConsensusConfig) -> Result<Self, VerityError> {
        let claim_id = claim_id.into();
        if claim_id.trim().is_empty() {
            return Err(VerityError::invalid("claim id is required"));
        }
        config.validate()?;
        Ok(Self {
            claim_id,
            config,
            opinions: Vec::new(),
            voters: HashSet::new(),
            phase: RoundPhase::Collecting,
            result: None,
        })
    }

    pub fn claim_id(&self) -> &str {
        &self.claim_id
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Opinions accepted so far, in arrival order.
    pub fn opinions(&self) -> &[Opinion] {
        &self.opinions
    }

    pub fn has_voted(&self, validator: &ValidatorId) -> bool {
        self.voters.contains(validator)
    }

    /// Append an opinion.
    ///
    /// Rejected with `InvalidState` once the round is aggregated and with
    /// `InputValidation` for a second vote from the same validator.
    pub fn submit(&mut self, opinion: Opinion) -> Result<(), VerityError> {
        if self.phase != RoundPhase::Collecting {
            return Err(VerityError::InvalidState(format!(
                "round for claim {} is closed",
                self.claim_id
            )));
        }
        if opinion.validator_id.is_empty() {
            return Err(VerityError::invalid("opinion without validator id"));
        }
        if self.voters.contains(&opinion.validator_id) {
            return Err(VerityError::invalid(format!(
                "validator {} already voted on claim {}",
                opinion.validator_id, self.claim_id
            )));
        }
        self.voters.insert(opinion.validator_id.clone());
        self.opinions.push(opinion);
        Ok(())
    }

    /// Stop collecting and aggregate.
    ///
    /// Closing twice returns the same result; nothing submitted afterwards
    /// can change it.
    pub fn close(&mut self) -> Result<ConsensusResult, VerityError> {
        if let Some(result) = &self.result {
            return Ok(result.clone());
        }
        let result = aggregate_validations(&self.claim_id, &self.opinions, &self.config)?;
        self.phase = RoundPhase::Aggregated(result.status);
        self.result = Some(result.clone());
        Ok(result)
    }

    /// The final result, once closed.
    pub fn result(&self) -> Option<&ConsensusResult> {
        self.result.as_ref()
    }
}
