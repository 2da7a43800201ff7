// crates/verity-consensus/src/collusion.rs
//
// Correlated-voting detection over past consensus results.
//
// Votes are aligned by claim. For every candidate pair that voted on enough
// of the same claims, the Pearson correlation of their {0, 1} vote sequences
// is computed; near-lockstep pairs are flagged.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use verity_core::{ConsensusResult, ValidatorId};

/// Minimum number of past results before detection runs at all.
pub const MIN_RESULTS: usize = 5;
/// Minimum shared claims before a pair is compared.
pub const MIN_SHARED_CLAIMS: usize = 5;
/// Correlation strictly above this flags a pair.
pub const CORRELATION_THRESHOLD: f64 = 0.90;

/// A flagged validator pair. `first < second`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedPair {
    pub first: ValidatorId,
    pub second: ValidatorId,
    pub correlation: f64,
    pub shared_claims: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CollusionReport {
    pub detected: bool,
    /// Highest flagged correlation, 0.0 when nothing was flagged.
    pub probability: f64,
    /// Members of flagged pairs, sorted, without duplicates.
    pub suspects: Vec<ValidatorId>,
    pub pairs: Vec<CorrelatedPair>,
}

impl CollusionReport {
    fn clean() -> Self {
        Self::default()
    }
}

/// Look for validator pairs that vote in lockstep.
///
/// If several results share a claim id, the later one in `past_results` wins.
/// Candidates are deduplicated; empty ids are ignored.
pub fn detect_collusion(
    past_results: &[ConsensusResult],
    validator_ids: &[ValidatorId],
) -> CollusionReport {
    let candidates: BTreeSet<&ValidatorId> =
        validator_ids.iter().filter(|id| !id.is_empty()).collect();
    if past_results.len() < MIN_RESULTS || candidates.len() < 2 {
        return CollusionReport::clean();
    }

    // claim -> validator -> vote
    let mut votes: BTreeMap<&str, HashMap<&ValidatorId, bool>> = BTreeMap::new();
    for result in past_results {
        let by_validator = result
            .opinions
            .iter()
            .map(|o| (&o.validator_id, o.result))
            .collect();
        votes.insert(result.claim_id.as_str(), by_validator);
    }

    let candidates: Vec<&ValidatorId> = candidates.into_iter().collect();
    let mut pairs = Vec::new();
    for (i, first) in candidates.iter().enumerate() {
        for second in &candidates[i + 1..] {
            let (xs, ys): (Vec<f64>, Vec<f64>) = votes
                .values()
                .filter_map(|claim| Some((*claim.get(*first)?, *claim.get(*second)?)))
                .map(|(a, b)| (vote_value(a), vote_value(b)))
                .unzip();
            if xs.len() < MIN_SHARED_CLAIMS {
                continue;
            }
            let correlation = pearson(&xs, &ys);
            if correlation > CORRELATION_THRESHOLD {
                pairs.push(CorrelatedPair {
                    first: (*first).clone(),
                    second: (*second).clone(),
                    correlation,
                    shared_claims: xs.len(),
                });
            }
        }
    }

    if pairs.is_empty() {
        return CollusionReport::clean();
    }

    let probability = pairs
        .iter()
        .map(|p| p.correlation)
        .fold(0.0_f64, f64::max);
    let suspects: BTreeSet<ValidatorId> = pairs
        .iter()
        .flat_map(|p| [p.first.clone(), p.second.clone()])
        .collect();

    CollusionReport {
        detected: true,
        probability,
        suspects: suspects.into_iter().collect(),
        pairs,
    }
}

fn vote_value(vote: bool) -> f64 {
    if vote {
        1.0
    } else {
        0.0
    }
}

/// Pearson correlation of two equal-length sequences.
///
/// Identical sequences give exactly 1.0, constant ones included. Otherwise a
/// sequence with no variance has no defined correlation and yields 0.0.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    if xs == ys {
        return 1.0;
    }

    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= f64::EPSILON || syy <= f64::EPSILON {
        return 0.0;
    }
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use verity_core::{ConsensusStatus, Opinion, TrustScore};

    fn result(claim: &str, votes: &[(&str, bool)]) -> ConsensusResult {
        let at = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
        ConsensusResult {
            claim_id: claim.to_string(),
            status: ConsensusStatus::Rejected,
            accepted: false,
            weighted_for: 0,
            weighted_against: 0,
            ratio: 0.0,
            opinions: votes
                .iter()
                .map(|(id, v)| Opinion::new(*id, *v, TrustScore::new(500), at))
                .collect(),
            decided_at: Some(at),
        }
    }

    fn ids(names: &[&str]) -> Vec<ValidatorId> {
        names.iter().map(|n| ValidatorId::from(*n)).collect()
    }

    #[test]
    fn identical_voting_is_perfectly_correlated() {
        let pattern = [true, false, true, true, false, true];
        let results: Vec<_> = pattern
            .iter()
            .enumerate()
            .map(|(i, &v)| result(&format!("c{}", i), &[("a", v), ("b", v), ("c", i % 2 == 0)]))
            .collect();

        let report = detect_collusion(&results, &ids(&["a", "b"]));
        assert!(report.detected);
        assert_eq!(report.probability, 1.0);
        assert_eq!(report.suspects, ids(&["a", "b"]));
        assert_eq!(report.pairs.len(), 1);
        assert_eq!(report.pairs[0].shared_claims, 6);
    }

    #[test]
    fn fewer_than_five_shared_claims_is_never_suspected() {
        let mut results: Vec<_> = (0..4)
            .map(|i| result(&format!("c{}", i), &[("a", i % 2 == 0), ("b", i % 2 == 0)]))
            .collect();
        // Enough results overall, but "b" missed these claims.
        for i in 4..8 {
            results.push(result(&format!("c{}", i), &[("a", i % 2 == 0), ("c", true)]));
        }

        let report = detect_collusion(&results, &ids(&["a", "b"]));
        assert!(!report.detected);
        assert_eq!(report.probability, 0.0);
        assert!(report.suspects.is_empty());
    }

    #[test]
    fn too_few_results_or_candidates_is_not_detected() {
        let results: Vec<_> = (0..4)
            .map(|i| result(&format!("c{}", i), &[("a", i % 2 == 0), ("b", i % 2 == 0)]))
            .collect();
        assert!(!detect_collusion(&results, &ids(&["a", "b"])).detected);

        let results: Vec<_> = (0..6)
            .map(|i| result(&format!("c{}", i), &[("a", i % 2 == 0), ("b", i % 2 == 0)]))
            .collect();
        assert!(!detect_collusion(&results, &ids(&["a"])).detected);
        assert!(!detect_collusion(&results, &ids(&["a", "a"])).detected);
    }

    #[test]
    fn always_agreeing_voters_are_flagged() {
        let results: Vec<_> = (0..6)
            .map(|i| result(&format!("c{}", i), &[("a", true), ("b", true), ("c", i % 2 == 0)]))
            .collect();
        let report = detect_collusion(&results, &ids(&["a", "b"]));
        assert!(report.detected);
        assert_eq!(report.probability, 1.0);
        assert_eq!(report.suspects, ids(&["a", "b"]));
    }

    #[test]
    fn constant_voter_against_varying_voter_is_not_flagged() {
        let results: Vec<_> = (0..6)
            .map(|i| result(&format!("c{}", i), &[("a", true), ("c", i % 2 == 0)]))
            .collect();
        let report = detect_collusion(&results, &ids(&["a", "c"]));
        assert!(!report.detected);
        assert_eq!(pearson(&[1.0; 4], &[0.0; 4]), 0.0);
    }

    #[test]
    fn independent_voters_are_not_flagged() {
        let a = [true, true, false, false, true, false];
        let b = [true, false, true, false, false, true];
        let results: Vec<_> = (0..6)
            .map(|i| result(&format!("c{}", i), &[("a", a[i]), ("b", b[i])]))
            .collect();
        let report = detect_collusion(&results, &ids(&["a", "b"]));
        assert!(!report.detected);
    }

    #[test]
    fn later_result_for_same_claim_wins() {
        let pattern = [true, false, true, false, true];
        let mut results: Vec<_> = pattern
            .iter()
            .enumerate()
            .map(|(i, &v)| result(&format!("c{}", i), &[("a", v), ("b", !v)]))
            .collect();
        // Re-decided claims: now "b" agrees with "a" everywhere.
        for (i, &v) in pattern.iter().enumerate() {
            results.push(result(&format!("c{}", i), &[("a", v), ("b", v)]));
        }
        let report = detect_collusion(&results, &ids(&["b", "a"]));
        assert!(report.detected);
        assert_eq!(report.pairs[0].first.as_str(), "a");
        assert_eq!(report.pairs[0].shared_claims, 5);
    }

    #[test]
    fn pearson_of_opposite_sequences_is_negative_one() {
        let xs = [1.0, 0.0, 1.0, 0.0];
        let ys = [0.0, 1.0, 0.0, 1.0];
        assert!((pearson(&xs, &ys) + 1.0).abs() < 1e-12);
    }
}
