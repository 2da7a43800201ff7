// crates/verity-consensus/src/commitment.rs
//
// Tamper-evident commitments over consensus results.
//
// A commitment is a SHA-256 digest over the aggregate numbers and the opinion
// set in canonical order. Anyone holding the result can recompute it; the
// digest reveals nothing about the votes.

use std::fmt;

use serde::{Serialize, Serializer};

use verity_core::crypto::{hash_bytes, FieldHasher};
use verity_core::{ConsensusResult, Opinion};

const COMMITMENT_DOMAIN: &str = "verity/consensus-commitment/v1";

/// 32-byte digest committing to a consensus result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConsensusCommitment([u8; 32]);

impl ConsensusCommitment {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ConsensusCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ConsensusCommitment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Produces commitments for finished rounds.
pub trait CommitmentScheme: Send + Sync {
    fn commit(&self, result: &ConsensusResult) -> ConsensusCommitment;
}

/// The default scheme: [`generate_consensus_proof`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Commitment;

impl CommitmentScheme for Sha256Commitment {
    fn commit(&self, result: &ConsensusResult) -> ConsensusCommitment {
        generate_consensus_proof(result)
    }
}

/// Deterministic digest of a consensus result.
///
/// Opinions are re-sorted by validator id before hashing, so two results that
/// differ only in opinion order commit to the same value.
pub fn generate_consensus_proof(result: &ConsensusResult) -> ConsensusCommitment {
    let mut h = FieldHasher::new(COMMITMENT_DOMAIN);
    h.bytes(result.claim_id.as_bytes())
        .u8(result.status.tag())
        .u8(result.accepted as u8)
        .u64(result.weighted_for)
        .u64(result.weighted_against)
        .f64(result.ratio);
    match result.decided_at {
        Some(at) => h.u8(1).i64(at.timestamp_millis()),
        None => h.u8(0),
    };

    let mut opinions: Vec<&Opinion> = result.opinions.iter().collect();
    opinions.sort_by(|a, b| a.validator_id.cmp(&b.validator_id));
    h.u64(opinions.len() as u64);
    for opinion in opinions {
        h.bytes(opinion.validator_id.as_str().as_bytes())
            .u8(opinion.result as u8)
            .u32(opinion.trust_score.value())
            .i64(opinion.timestamp.timestamp_millis());
        match &opinion.evidence {
            Some(evidence) => h.u8(1).bytes(&hash_bytes(evidence)),
            None => h.u8(0),
        };
    }

    ConsensusCommitment(h.finish())
}
