// crates/verity-cli/src/commands/mod.rs
//
// Command module declarations and shared plumbing for the Verity CLI.

pub mod aggregate;
pub mod collusion;
pub mod commit;
pub mod predict;
pub mod score;

use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use verity_consensus::ConsensusEngine;
use verity_core::{
    Clock, Opinion, ParticipantId, TracingTelemetry, ValidationRequest, ValidatorTransport,
    VerityError,
};
use verity_reputation::ReputationEngine;

use crate::config::VerityConfig;
use crate::output::OutputFormat;

/// Everything a command needs besides its own arguments.
pub struct Context {
    pub config: VerityConfig,
    pub format: OutputFormat,
    pub clock: Arc<dyn Clock>,
}

impl Context {
    pub fn reputation_engine(&self) -> ReputationEngine {
        ReputationEngine::new(
            self.config.reputation_config(),
            Arc::clone(&self.clock),
            Arc::new(TracingTelemetry),
        )
    }

    /// Consensus engine for local data. It has no validators to reach.
    pub fn consensus_engine(&self) -> ConsensusEngine {
        ConsensusEngine::new(Arc::new(OfflineTransport))
    }
}

struct OfflineTransport;

#[async_trait]
impl ValidatorTransport for OfflineTransport {
    async fn request_opinion(
        &self,
        validator: &ParticipantId,
        _request: &ValidationRequest,
    ) -> Result<Opinion, VerityError> {
        Err(VerityError::Collaborator(format!(
            "offline: cannot reach validator {}",
            validator
        )))
    }
}

/// Read and parse a JSON input file. `-` reads standard input.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, VerityError> {
    let contents = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| VerityError::invalid(format!("stdin: {}", e)))?;
        buf
    } else {
        fs::read_to_string(path)
            .map_err(|e| VerityError::invalid(format!("{}: {}", path.display(), e)))?
    };
    let value = serde_json::from_str(&contents)
        .map_err(|e| VerityError::invalid(format!("{}: {}", path.display(), e)))?;
    Ok(value)
}
