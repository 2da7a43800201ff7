// crates/verity-reputation/src/lib.rs
//
// verity-reputation: Time-decayed trust scoring, Bayesian updates, and trend
// prediction for the Verity network.
//
// This crate owns every formula that turns evidence into a trust score and
// the registry that serializes updates per participant. Scores feed the
// consensus engine as vote weights; consensus outcomes come back here as
// evidence.

pub mod decay;
pub mod engine;
pub mod math;
pub mod registry;

pub use decay::DecayFunction;
pub use engine::{ReputationConfig, ReputationEngine, TrendFallback, TrendPrediction};
pub use registry::{TrustAccount, TrustRegistry};
