// crates/verity-cli/tests/consensus_pipeline.rs
//
// Integration tests for the wired-up trust and consensus pipeline.
//
// A scripted transport stands in for the validator network. Trust scores come
// from a live TrustRegistry, consensus outcomes are fed back into it, and the
// same registry then drives the next round. These tests use the public APIs
// of the library crates directly since the CLI is a binary crate.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use verity_consensus::{generate_consensus_proof, ConsensusEngine};
use verity_core::{
    ConsensusConfig, ConsensusStatus, EngineEvent, FixedClock, Opinion, ParticipantId,
    RecordingTelemetry, TrustScore, ValidationRequest, ValidatorId, ValidatorTransport,
    VerityError,
};
use verity_reputation::{ReputationConfig, ReputationEngine, TrustRegistry};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

/// Answers from a fixed script of (claim, validator) -> vote. Validators in
/// `slow` never answer within any reasonable deadline.
struct ScriptedTransport {
    votes: HashMap<(String, String), bool>,
    slow: HashSet<String>,
}

impl ScriptedTransport {
    fn new() -> Self {
        Self {
            votes: HashMap::new(),
            slow: HashSet::new(),
        }
    }

    fn vote(mut self, claim: &str, validator: &str, result: bool) -> Self {
        self.votes
            .insert((claim.to_string(), validator.to_string()), result);
        self
    }

    fn slow(mut self, validator: &str) -> Self {
        self.slow.insert(validator.to_string());
        self
    }
}

#[async_trait]
impl ValidatorTransport for ScriptedTransport {
    async fn request_opinion(
        &self,
        validator: &ParticipantId,
        request: &ValidationRequest,
    ) -> Result<Opinion, VerityError> {
        if self.slow.contains(validator.as_str()) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        let key = (request.claim_id.clone(), validator.as_str().to_string());
        let result = self
            .votes
            .get(&key)
            .copied()
            .ok_or_else(|| VerityError::Collaborator(format!("{} has no vote", validator)))?;
        // Transport-reported trust is deliberately wrong; the registry stamp wins.
        Ok(Opinion::new(validator.clone(), result, TrustScore::MAX, t0()))
    }
}

async fn seeded_registry() -> (Arc<TrustRegistry>, Arc<RecordingTelemetry>) {
    let telemetry = Arc::new(RecordingTelemetry::new());
    let engine = ReputationEngine::new(
        ReputationConfig::default(),
        Arc::new(FixedClock::new(t0())),
        telemetry.clone(),
    );
    let registry = Arc::new(TrustRegistry::new(Arc::new(engine)));

    // 0.6 * 900 + 0.2 * 500 + 0.2 * 510 = 742
    registry
        .record_validation_outcome(&"v1".into(), TrustScore::new(900), true)
        .await
        .unwrap();
    registry
        .record_validation_outcome(&"v2".into(), TrustScore::new(900), true)
        .await
        .unwrap();
    // 0.6 * 200 + 0.2 * 500 + 0.2 * 480 = 316
    registry
        .record_validation_outcome(&"v3".into(), TrustScore::new(200), false)
        .await
        .unwrap();
    registry.register(&"v4".into()).unwrap();

    (registry, telemetry)
}

fn ids(names: &[&str]) -> Vec<ValidatorId> {
    names.iter().map(|n| ValidatorId::from(*n)).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn round_uses_registry_trust_and_feeds_outcome_back() {
    let (registry, _) = seeded_registry().await;
    assert_eq!(registry.snapshot(&"v1".into()).value(), 742);
    assert_eq!(registry.snapshot(&"v3".into()).value(), 316);

    let transport = ScriptedTransport::new()
        .vote("claim-1", "v1", true)
        .vote("claim-1", "v2", true)
        .vote("claim-1", "v3", false)
        .vote("claim-1", "v4", false)
        .slow("v4");
    let telemetry = Arc::new(RecordingTelemetry::new());
    let engine = ConsensusEngine::new(Arc::new(transport))
        .with_trust_source(registry.clone())
        .with_telemetry(telemetry.clone());

    let request = ValidationRequest::new("claim-1", ids(&["v1", "v2", "v3", "v4"]));
    let result = engine
        .request_validations(&request, &ConsensusConfig::default())
        .await
        .unwrap();

    // v4 missed the 30s deadline; the rest count with their registry scores.
    assert_eq!(result.status, ConsensusStatus::Accepted);
    assert_eq!(result.weighted_for, 742 + 742);
    assert_eq!(result.weighted_against, 316);
    assert!((result.ratio - 1484.0 / 1800.0).abs() < 1e-12);
    let voters: Vec<&str> = result.opinions.iter().map(|o| o.validator_id.as_str()).collect();
    assert_eq!(voters, vec!["v1", "v2", "v3"]);

    let dropped: Vec<EngineEvent> = telemetry
        .events()
        .into_iter()
        .filter(|e| matches!(e, EngineEvent::OpinionDropped { .. }))
        .collect();
    assert_eq!(dropped.len(), 1);
    assert!(matches!(
        &dropped[0],
        EngineEvent::OpinionDropped { validator_id, .. } if validator_id.as_str() == "v4"
    ));

    // Feedback: agreeing voters move toward 1000, the dissenter toward 0.
    let updated = registry.apply_consensus_outcome(&result).await.unwrap();
    assert_eq!(updated.len(), 3);
    assert_eq!(registry.snapshot(&"v1".into()).value(), 768);
    assert_eq!(registry.snapshot(&"v2".into()).value(), 768);
    assert_eq!(registry.snapshot(&"v3".into()).value(), 284);
    assert_eq!(registry.snapshot(&"v4".into()).value(), 500);

    let v3 = registry.account(&"v3".into()).await.unwrap();
    assert_eq!(v3.validation_rate.value(), 460);
    assert_eq!(v3.accuracy_history.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn insufficient_round_leaves_trust_untouched() {
    let (registry, _) = seeded_registry().await;
    let transport = ScriptedTransport::new()
        .vote("claim-2", "v1", true)
        .vote("claim-2", "v2", true)
        .slow("v3");
    let engine = ConsensusEngine::new(Arc::new(transport))
        .with_trust_source(registry.clone())
        .with_telemetry(Arc::new(RecordingTelemetry::new()));

    let config = ConsensusConfig {
        timeout: Duration::from_secs(5),
        ..ConsensusConfig::default()
    };
    let request = ValidationRequest::new("claim-2", ids(&["v1", "v2", "v3"]));
    let result = engine.request_validations(&request, &config).await.unwrap();

    assert_eq!(result.status, ConsensusStatus::Insufficient);
    assert!(!result.accepted);
    assert_eq!(result.ratio, 0.0);

    let updated = registry.apply_consensus_outcome(&result).await.unwrap();
    assert!(updated.is_empty());
    assert_eq!(registry.snapshot(&"v1".into()).value(), 742);
}

#[tokio::test(start_paused = true)]
async fn lockstep_validators_are_flagged_across_rounds() {
    let (registry, _) = seeded_registry().await;
    let lockstep = [true, false, true, true, false];
    let independent = [true, true, false, true, false];

    let mut transport = ScriptedTransport::new().slow("v4");
    for (i, (&paired, &solo)) in lockstep.iter().zip(independent.iter()).enumerate() {
        let claim = format!("claim-{}", i);
        transport = transport
            .vote(&claim, "v1", paired)
            .vote(&claim, "v2", paired)
            .vote(&claim, "v3", solo);
    }
    let telemetry = Arc::new(RecordingTelemetry::new());
    let engine = ConsensusEngine::new(Arc::new(transport))
        .with_trust_source(registry.clone())
        .with_telemetry(telemetry.clone());

    let config = ConsensusConfig {
        timeout: Duration::from_secs(2),
        ..ConsensusConfig::default()
    };
    let mut history = Vec::new();
    for i in 0..lockstep.len() {
        let request = ValidationRequest::new(format!("claim-{}", i), ids(&["v1", "v2", "v3", "v4"]));
        let result = engine.request_validations(&request, &config).await.unwrap();
        registry.apply_consensus_outcome(&result).await.unwrap();
        history.push(result);
    }

    let report = engine.detect_collusion(&history, &ids(&["v1", "v2", "v3", "v4"]));
    assert!(report.detected);
    assert_eq!(report.probability, 1.0);
    assert_eq!(report.suspects, ids(&["v1", "v2"]));
    assert_eq!(report.pairs.len(), 1);
    assert_eq!(report.pairs[0].shared_claims, 5);
    assert!(telemetry
        .events()
        .iter()
        .any(|e| matches!(e, EngineEvent::CollusionSuspected { .. })));
}

#[tokio::test(start_paused = true)]
async fn commitment_is_stable_for_a_decided_round() {
    let (registry, _) = seeded_registry().await;
    let transport = ScriptedTransport::new()
        .vote("claim-9", "v1", false)
        .vote("claim-9", "v2", true)
        .vote("claim-9", "v3", true);
    let engine = ConsensusEngine::new(Arc::new(transport))
        .with_trust_source(registry.clone())
        .with_telemetry(Arc::new(RecordingTelemetry::new()));

    let request = ValidationRequest::new("claim-9", ids(&["v3", "v2", "v1"]));
    let first = engine
        .request_validations(&request, &ConsensusConfig::default())
        .await
        .unwrap();
    let second = engine
        .request_validations(&request, &ConsensusConfig::default())
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(engine.commit(&first), engine.commit(&second));
    assert_eq!(engine.commit(&first), generate_consensus_proof(&first));

    let mut tampered = first.clone();
    tampered.opinions[0].result = !tampered.opinions[0].result;
    assert_ne!(engine.commit(&first), engine.commit(&tampered));
}
