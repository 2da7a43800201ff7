// crates/verity-consensus/src/aggregate.rs
//
// Trust-weighted aggregation of validator opinions for the Verity network.
//
// Each opinion counts with the trust score its validator held at vote time.
// The claim is accepted when the trust-weighted share of "true" votes reaches
// the configured threshold. Aggregation is a pure function of the opinion set:
// order never matters and no randomness is involved.

use std::collections::HashSet;

use verity_core::{ConsensusConfig, ConsensusResult, ConsensusStatus, Opinion, VerityError};

/// Aggregate a claim's opinions into an immutable result.
///
/// # Arguments
/// * `claim_id` - The claim being decided. Must be non-empty.
/// * `opinions` - One opinion per validator, in any order.
/// * `config` - Minimum opinion count and acceptance threshold.
///
/// # Errors
/// `InputValidation` for an empty claim id, an invalid config, an empty
/// validator id, or two opinions from the same validator. Too few opinions
/// is not an error: it yields an `Insufficient` result.
pub fn aggregate_validations(
    claim_id: &str,
    opinions: &[Opinion],
    config: &ConsensusConfig,
) -> Result<ConsensusResult, VerityError> {
    if claim_id.trim().is_empty() {
        return Err(VerityError::invalid("claim id is required"));
    }
    config.validate()?;

    let mut seen = HashSet::with_capacity(opinions.len());
    for opinion in opinions {
        if opinion.validator_id.is_empty() {
            return Err(VerityError::invalid("opinion without validator id"));
        }
        if !seen.insert(&opinion.validator_id) {
            return Err(VerityError::invalid(format!(
                "validator {} voted more than once on claim {}",
                opinion.validator_id, claim_id
            )));
        }
    }

    // Canonical order: ascending validator id.
    let mut ordered: Vec<Opinion> = opinions.to_vec();
    ordered.sort_by(|a, b| a.validator_id.cmp(&b.validator_id));
    let decided_at = ordered.iter().map(|o| o.timestamp).max();

    // Too few opinions: reported as fully "against" with zero weights,
    // whatever the votes said.
    if ordered.len() < config.min_opinions {
        return Ok(ConsensusResult {
            claim_id: claim_id.to_string(),
            status: ConsensusStatus::Insufficient,
            accepted: false,
            weighted_for: 0,
            weighted_against: 0,
            ratio: 0.0,
            opinions: ordered,
            decided_at,
        });
    }

    // Integer sums keep the totals exact and independent of order.
    let mut weighted_for: u64 = 0;
    let mut weighted_against: u64 = 0;
    for opinion in &ordered {
        let weight = opinion.trust_score.value() as u64;
        if opinion.result {
            weighted_for += weight;
        } else {
            weighted_against += weight;
        }
    }

    let total = weighted_for + weighted_against;
    let ratio = if total > 0 {
        weighted_for as f64 / total as f64
    } else {
        0.0
    };

    let accepted = ratio >= config.threshold;
    let status = if accepted {
        ConsensusStatus::Accepted
    } else {
        ConsensusStatus::Rejected
    };

    Ok(ConsensusResult {
        claim_id: claim_id.to_string(),
        status,
        accepted,
        weighted_for,
        weighted_against,
        ratio,
        opinions: ordered,
        decided_at,
    })
}
