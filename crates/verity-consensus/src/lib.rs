// crates/verity-consensus/src/lib.rs
//
// verity-consensus: trust-weighted claim consensus for the Verity network.
//
// Validators vote on a claim; each vote counts with the validator's trust
// score. This crate aggregates votes into immutable results, runs fan-out
// rounds against a validator transport under a global deadline, flags
// validators that vote in lockstep, and commits to finished results.

pub mod aggregate;
pub mod collusion;
pub mod commitment;
pub mod engine;
pub mod round;

pub use aggregate::aggregate_validations;
pub use collusion::{detect_collusion, CollusionReport, CorrelatedPair};
pub use commitment::{
    generate_consensus_proof, CommitmentScheme, ConsensusCommitment, Sha256Commitment,
};
pub use engine::ConsensusEngine;
pub use round::{RoundPhase, ValidationRound};
