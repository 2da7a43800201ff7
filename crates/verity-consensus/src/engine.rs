// crates/verity-consensus/src/engine.rs
//
// ConsensusEngine: fans a validation request out to validators, gathers the
// opinions that arrive before the deadline, and aggregates them.
//
// A validator can only ever remove its own opinion from a round. Transport
// errors, mismatched replies, panics and late answers are dropped and reported
// through telemetry; the round itself still closes with whatever arrived.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio::time::Instant;

use verity_core::{
    ConsensusConfig, ConsensusResult, EngineEvent, Opinion, Telemetry, TracingTelemetry,
    TrustSource, ValidationRequest, ValidatorId, ValidatorTransport, VerityError,
};

use crate::aggregate::aggregate_validations;
use crate::collusion::{detect_collusion, CollusionReport};
use crate::commitment::{CommitmentScheme, ConsensusCommitment, Sha256Commitment};
use crate::round::ValidationRound;

/// Orchestrates claim validation rounds.
///
/// Collaborators are injected: the transport that reaches validators, an
/// optional trust source used to stamp each opinion with the validator's
/// current score, the telemetry sink, and the commitment scheme.
pub struct ConsensusEngine {
    transport: Arc<dyn ValidatorTransport>,
    trust: Option<Arc<dyn TrustSource>>,
    telemetry: Arc<dyn Telemetry>,
    commitment: Arc<dyn CommitmentScheme>,
}

impl std::fmt::Debug for ConsensusEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsensusEngine")
            .field("stamps_trust", &self.trust.is_some())
            .finish_non_exhaustive()
    }
}

impl ConsensusEngine {
    pub fn new(transport: Arc<dyn ValidatorTransport>) -> Self {
        Self {
            transport,
            trust: None,
            telemetry: Arc::new(TracingTelemetry),
            commitment: Arc::new(Sha256Commitment),
        }
    }

    /// Overwrite each opinion's trust score with the source's current view
    /// of the validator.
    pub fn with_trust_source(mut self, trust: Arc<dyn TrustSource>) -> Self {
        self.trust = Some(trust);
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn with_commitment_scheme(mut self, commitment: Arc<dyn CommitmentScheme>) -> Self {
        self.commitment = commitment;
        self
    }

    /// Ask every validator in `request` for an opinion and aggregate the
    /// ones that answer before `config.timeout`.
    ///
    /// Only an invalid request or config is an error. Duplicate validators
    /// in the request are asked once.
    pub async fn request_validations(
        &self,
        request: &ValidationRequest,
        config: &ConsensusConfig,
    ) -> Result<ConsensusResult, VerityError> {
        request.validate()?;
        let mut round = ValidationRound::open(request.claim_id.clone(), config.clone())?;

        let validators: BTreeSet<ValidatorId> = request.validators.iter().cloned().collect();
        // A timeout too large to represent waits for every validator.
        let deadline = Instant::now().checked_add(config.timeout);
        let shared = Arc::new(request.clone());

        let mut tasks = JoinSet::new();
        for validator in &validators {
            let transport = Arc::clone(&self.transport);
            let request = Arc::clone(&shared);
            let validator = validator.clone();
            tasks.spawn(async move {
                let outcome = transport.request_opinion(&validator, &request).await;
                (validator, outcome)
            });
        }

        let mut answered: HashSet<ValidatorId> = HashSet::new();
        let mut timed_out = false;
        loop {
            let next = match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, tasks.join_next()).await,
                None => Ok(tasks.join_next().await),
            };
            match next {
                Ok(Some(Ok((validator, outcome)))) => {
                    answered.insert(validator.clone());
                    match outcome {
                        Ok(opinion) => self.accept(&mut round, &validator, opinion),
                        Err(err) => self.dropped(&request.claim_id, validator, err.to_string()),
                    }
                }
                // Panicked task; the validator is reported below as missing.
                Ok(Some(Err(_))) => {}
                Ok(None) => break,
                Err(_) => {
                    timed_out = true;
                    tasks.abort_all();
                    break;
                }
            }
        }

        let missing_reason = if timed_out {
            "no response before deadline"
        } else {
            "validator task failed"
        };
        for validator in validators.iter().filter(|v| !answered.contains(*v)) {
            self.dropped(&request.claim_id, validator.clone(), missing_reason.to_string());
        }

        self.telemetry.record(EngineEvent::RoundClosed {
            claim_id: request.claim_id.clone(),
            requested: validators.len(),
            received: round.opinions().len(),
            timed_out,
        });

        let result = round.close()?;
        self.telemetry.record(EngineEvent::ConsensusDecided {
            claim_id: result.claim_id.clone(),
            status: result.status,
            ratio: result.ratio,
        });
        Ok(result)
    }

    fn accept(&self, round: &mut ValidationRound, validator: &ValidatorId, mut opinion: Opinion) {
        if &opinion.validator_id != validator {
            self.dropped(
                round.claim_id(),
                validator.clone(),
                format!("reply signed as {}", opinion.validator_id),
            );
            return;
        }
        if let Some(trust) = &self.trust {
            opinion.trust_score = trust.trust_score(validator);
        }
        if let Err(err) = round.submit(opinion) {
            self.dropped(round.claim_id(), validator.clone(), err.to_string());
        }
    }

    fn dropped(&self, claim_id: &str, validator_id: ValidatorId, reason: String) {
        self.telemetry.record(EngineEvent::OpinionDropped {
            claim_id: claim_id.to_string(),
            validator_id,
            reason,
        });
    }

    /// Aggregate an already-collected opinion set.
    pub fn aggregate(
        &self,
        claim_id: &str,
        opinions: &[Opinion],
        config: &ConsensusConfig,
    ) -> Result<ConsensusResult, VerityError> {
        let result = aggregate_validations(claim_id, opinions, config)?;
        self.telemetry.record(EngineEvent::ConsensusDecided {
            claim_id: result.claim_id.clone(),
            status: result.status,
            ratio: result.ratio,
        });
        Ok(result)
    }

    /// Run collusion detection and report each flagged pair.
    pub fn detect_collusion(
        &self,
        past_results: &[ConsensusResult],
        validator_ids: &[ValidatorId],
    ) -> CollusionReport {
        let report = detect_collusion(past_results, validator_ids);
        for pair in &report.pairs {
            self.telemetry.record(EngineEvent::CollusionSuspected {
                first: pair.first.clone(),
                second: pair.second.clone(),
                correlation: pair.correlation,
                shared_claims: pair.shared_claims,
            });
        }
        report
    }

    pub fn commit(&self, result: &ConsensusResult) -> ConsensusCommitment {
        self.commitment.commit(result)
    }
}
