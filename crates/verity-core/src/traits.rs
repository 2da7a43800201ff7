// crates/verity-core/src/traits.rs

use async_trait::async_trait;

use crate::consensus::{Opinion, ValidationRequest};
use crate::error::VerityError;
use crate::identity::ParticipantId;
use crate::score::TrustScore;

/// Reaches a single validator and returns its opinion on a claim.
///
/// Implemented outside the core (HTTP relay, libp2p request-response, a
/// scripted fake in tests). Implementations own their per-call retries and
/// error logging; the consensus engine only sees `Ok` or `Err`.
#[async_trait]
pub trait ValidatorTransport: Send + Sync {
    async fn request_opinion(
        &self,
        validator: &ParticipantId,
        request: &ValidationRequest,
    ) -> Result<Opinion, VerityError>;
}

/// Read-only view of current trust scores.
///
/// Implemented by the reputation registry. Reads are snapshots and never
/// block on in-flight updates.
pub trait TrustSource: Send + Sync {
    fn trust_score(&self, participant: &ParticipantId) -> TrustScore;
}
