// crates/verity-core/src/lib.rs
//
// verity-core: Core types, traits, and hashing primitives for the Verity
// claim-verification network.
//
// This is the leaf crate that the reputation and consensus engines depend on.
// It defines the trust score and opinion data model, the protocol error type,
// and the collaborator ports (transport, trust source, telemetry, clock).

pub mod clock;
pub mod consensus;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod score;
pub mod telemetry;
pub mod traits;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use verity_core::TrustScore;`

// Score types
pub use score::{AccuracyRecord, TrustScore, TrustWeights};

// Consensus types
pub use consensus::{ConsensusConfig, ConsensusResult, ConsensusStatus, Opinion, ValidationRequest};

// Identity types
pub use identity::{ParticipantId, ValidatorId};

// Error type
pub use error::VerityError;

// Ports
pub use clock::{Clock, FixedClock, SystemClock};
pub use telemetry::{EngineEvent, RecordingTelemetry, Telemetry, TracingTelemetry};
pub use traits::{TrustSource, ValidatorTransport};
