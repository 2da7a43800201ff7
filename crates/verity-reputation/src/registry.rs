// crates/verity-reputation/src/registry.rs
//
// Per-participant trust state for the Verity network.
//
// The registry is an arena of participant slots keyed by identity. Each slot
// carries its own lock, so updates to one participant are applied strictly in
// order while unrelated participants update in parallel. The current score is
// mirrored into an atomic so weight lookups never wait on an update.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use verity_core::{
    AccuracyRecord, ConsensusResult, EngineEvent, ParticipantId, TrustScore, TrustSource,
    VerityError,
};

use crate::engine::{ReputationEngine, TrendPrediction};

/// Full trust state of one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustAccount {
    pub participant: ParticipantId,
    pub score: TrustScore,
    /// Ascending by timestamp.
    pub accuracy_history: Vec<AccuracyRecord>,
    pub consistency_factor: TrustScore,
    pub validation_rate: TrustScore,
    /// Score of the most recent submission, compared against the next one.
    pub last_submission_score: Option<TrustScore>,
    pub total_submissions: u64,
    /// Self-declared or granted expertise per topic, on the 0..=1000 scale.
    pub domain_expertise: BTreeMap<String, TrustScore>,
    pub updated_at: DateTime<Utc>,
}

impl TrustAccount {
    /// A new participant: every factor starts at the 500 midpoint.
    pub fn new(participant: ParticipantId, now: DateTime<Utc>) -> Self {
        Self {
            participant,
            score: TrustScore::NEUTRAL,
            accuracy_history: Vec::new(),
            consistency_factor: TrustScore::NEUTRAL,
            validation_rate: TrustScore::NEUTRAL,
            last_submission_score: None,
            total_submissions: 0,
            domain_expertise: BTreeMap::new(),
            updated_at: now,
        }
    }

    /// Insert a record keeping ascending timestamp order, then apply the
    /// retention limit.
    fn push_record(&mut self, record: AccuracyRecord, max_history: Option<usize>) {
        let idx = self
            .accuracy_history
            .partition_point(|r| r.timestamp <= record.timestamp);
        self.accuracy_history.insert(idx, record);

        if let Some(limit) = max_history {
            if self.accuracy_history.len() > limit {
                let excess = self.accuracy_history.len() - limit;
                self.accuracy_history.drain(..excess);
            }
        }
    }
}

struct ParticipantSlot {
    score: AtomicU32,
    account: Mutex<TrustAccount>,
}

impl ParticipantSlot {
    fn new(account: TrustAccount) -> Self {
        Self {
            score: AtomicU32::new(account.score.value()),
            account: Mutex::new(account),
        }
    }

    fn publish(&self, score: TrustScore) {
        self.score.store(score.value(), Ordering::Release);
    }
}

/// The single writer of trust state.
pub struct TrustRegistry {
    engine: Arc<ReputationEngine>,
    slots: RwLock<HashMap<ParticipantId, Arc<ParticipantSlot>>>,
}

impl TrustRegistry {
    pub fn new(engine: Arc<ReputationEngine>) -> Self {
        Self {
            engine,
            slots: RwLock::new(HashMap::new()),
        }
    }

    pub fn engine(&self) -> &Arc<ReputationEngine> {
        &self.engine
    }

    fn existing_slot(&self, id: &ParticipantId) -> Option<Arc<ParticipantSlot>> {
        let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
        slots.get(id).cloned()
    }

    fn slot(&self, id: &ParticipantId) -> Result<Arc<ParticipantSlot>, VerityError> {
        if id.is_empty() {
            return Err(VerityError::invalid("participant id is required"));
        }
        if let Some(slot) = self.existing_slot(id) {
            return Ok(slot);
        }
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        let slot = slots
            .entry(id.clone())
            .or_insert_with(|| {
                Arc::new(ParticipantSlot::new(TrustAccount::new(
                    id.clone(),
                    self.engine.now(),
                )))
            })
            .clone();
        Ok(slot)
    }

    /// Ensure a participant exists. Idempotent; returns the current score.
    pub fn register(&self, id: &ParticipantId) -> Result<TrustScore, VerityError> {
        let slot = self.slot(id)?;
        Ok(TrustScore::new(slot.score.load(Ordering::Acquire)))
    }

    /// Current score without waiting on in-flight updates.
    /// Unknown participants read as the 500 midpoint.
    pub fn snapshot(&self, id: &ParticipantId) -> TrustScore {
        self.existing_slot(id)
            .map(|slot| TrustScore::new(slot.score.load(Ordering::Acquire)))
            .unwrap_or(TrustScore::NEUTRAL)
    }

    /// Copy of a participant's full state.
    pub async fn account(&self, id: &ParticipantId) -> Option<TrustAccount> {
        let slot = self.existing_slot(id)?;
        let account = slot.account.lock().await;
        Some(account.clone())
    }

    /// All known participants, sorted.
    pub fn participants(&self) -> Vec<ParticipantId> {
        let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<ParticipantId> = slots.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn recompute_locked(&self, account: &mut TrustAccount, now: DateTime<Utc>) -> TrustScore {
        let updated = self.engine.score_for(
            Some(&account.participant),
            account.score,
            &account.accuracy_history,
            account.consistency_factor,
            account.validation_rate,
            &self.engine.config().weights,
        );
        account.score = updated;
        account.updated_at = now;
        updated
    }

    /// Full recompute from the stored factors.
    pub async fn recompute(&self, id: &ParticipantId) -> Result<TrustScore, VerityError> {
        let slot = self.slot(id)?;
        let mut account = slot.account.lock().await;
        let now = self.engine.now();
        let score = self.recompute_locked(&mut account, now);
        slot.publish(score);
        Ok(score)
    }

    /// Record a new submission scored `submission_score`.
    ///
    /// Updates the consistency factor against the previous submission (the
    /// first submission has nothing to compare with), then recomputes.
    pub async fn record_submission(
        &self,
        id: &ParticipantId,
        submission_score: TrustScore,
    ) -> Result<TrustScore, VerityError> {
        let slot = self.slot(id)?;
        let mut account = slot.account.lock().await;
        let now = self.engine.now();

        account.total_submissions = account.total_submissions.saturating_add(1);
        if let Some(previous) = account.last_submission_score {
            account.consistency_factor = self.engine.update_consistency_factor(
                account.consistency_factor,
                submission_score,
                previous,
            );
        }
        account.last_submission_score = Some(submission_score);

        let score = self.recompute_locked(&mut account, now);
        slot.publish(score);
        Ok(score)
    }

    /// Record the outcome of validating one of the participant's submissions.
    pub async fn record_validation_outcome(
        &self,
        id: &ParticipantId,
        accuracy_score: TrustScore,
        is_validated: bool,
    ) -> Result<TrustScore, VerityError> {
        let slot = self.slot(id)?;
        let mut account = slot.account.lock().await;
        let now = self.engine.now();

        account.push_record(
            AccuracyRecord::new(now, accuracy_score),
            self.engine.config().max_history,
        );
        account.validation_rate = self
            .engine
            .update_validation_rate(account.validation_rate, is_validated);

        let score = self.recompute_locked(&mut account, now);
        slot.publish(score);
        Ok(score)
    }

    /// Incremental blend toward `evidence`, outside the full recompute path.
    pub async fn nudge(
        &self,
        id: &ParticipantId,
        evidence: TrustScore,
        weight: f64,
    ) -> Result<TrustScore, VerityError> {
        let slot = self.slot(id)?;
        let mut account = slot.account.lock().await;
        let score = self.nudge_locked(&mut account, evidence, weight);
        slot.publish(score);
        Ok(score)
    }

    fn nudge_locked(&self, account: &mut TrustAccount, evidence: TrustScore, weight: f64) -> TrustScore {
        let previous = account.score;
        let updated = self.engine.update_trust_score(previous, evidence, weight);
        account.score = updated;
        account.updated_at = self.engine.now();
        self.engine.telemetry().record(EngineEvent::ScoreNudged {
            participant: account.participant.clone(),
            previous,
            updated,
        });
        updated
    }

    /// Set the participant's expertise in a topic. Levels above 1000 are rejected.
    pub async fn set_domain_expertise(
        &self,
        id: &ParticipantId,
        domain: &str,
        level: u32,
    ) -> Result<(), VerityError> {
        if domain.trim().is_empty() {
            return Err(VerityError::invalid("domain is required"));
        }
        if level > TrustScore::MAX.value() {
            return Err(VerityError::invalid(format!(
                "expertise level must be between 0 and 1000, got {}",
                level
            )));
        }
        let slot = self.slot(id)?;
        let mut account = slot.account.lock().await;
        account
            .domain_expertise
            .insert(domain.to_string(), TrustScore::new(level));
        account.updated_at = self.engine.now();
        Ok(())
    }

    /// Trend prediction over the participant's stored history.
    pub async fn predict(&self, id: &ParticipantId, days_ahead: f64) -> TrendPrediction {
        match self.existing_slot(id) {
            Some(slot) => {
                let account = slot.account.lock().await;
                self.engine.predict_trend(&account.accuracy_history, days_ahead)
            }
            None => self.engine.predict_trend(&[], days_ahead),
        }
    }

    /// Feed a consensus outcome back into each voter's trust state.
    ///
    /// Voters who sided with the outcome are nudged toward 1000 and get a
    /// successful validation step; dissenters are nudged toward 0 and
    /// penalized. Each vote also lands in the voter's accuracy history at the
    /// round's decision time. Insufficient rounds carry no outcome and change
    /// nothing. Returns the updated scores in opinion order.
    pub async fn apply_consensus_outcome(
        &self,
        result: &ConsensusResult,
    ) -> Result<Vec<(ParticipantId, TrustScore)>, VerityError> {
        let mut updated = Vec::with_capacity(result.opinions.len());
        if result.is_insufficient() {
            return Ok(updated);
        }
        // Reject the whole outcome before any voter is touched.
        if result.opinions.iter().any(|o| o.validator_id.is_empty()) {
            return Err(VerityError::invalid(format!(
                "consensus result for {} has an opinion without a validator id",
                result.claim_id
            )));
        }
        let weight = self.engine.config().nudge_weight;

        for opinion in &result.opinions {
            let Some(agreed) = result.agrees(opinion) else {
                continue;
            };
            let evidence = if agreed { TrustScore::MAX } else { TrustScore::MIN };
            let at = result.decided_at.unwrap_or(opinion.timestamp);

            let slot = self.slot(&opinion.validator_id)?;
            let mut account = slot.account.lock().await;
            account.push_record(
                AccuracyRecord::new(at, evidence),
                self.engine.config().max_history,
            );
            account.validation_rate = self
                .engine
                .update_validation_rate(account.validation_rate, agreed);
            let score = self.nudge_locked(&mut account, evidence, weight);
            slot.publish(score);
            updated.push((opinion.validator_id.clone(), score));
        }
        Ok(updated)
    }
}

impl TrustSource for TrustRegistry {
    fn trust_score(&self, participant: &ParticipantId) -> TrustScore {
        self.snapshot(participant)
    }
}
