// crates/verity-cli/src/commands/commit.rs
//
// `verity commit`: print the commitment for a finished consensus result.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use verity_consensus::ConsensusCommitment;
use verity_core::ConsensusResult;

use super::aggregate::result_summary;
use super::{read_json, Context};
use crate::output::{emit, FieldRow};

/// Commitment command.
#[derive(Debug, Args)]
pub struct CommitCmd {
    /// JSON consensus result, as printed by `verity aggregate --json` ("-" for stdin).
    #[arg(long)]
    pub input: PathBuf,
}

#[derive(Debug, Serialize)]
struct CommitReport {
    claim_id: String,
    commitment: ConsensusCommitment,
}

/// Run the commit command.
pub async fn run(cmd: &CommitCmd, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let result: ConsensusResult = read_json(&cmd.input)?;
    let commitment = ctx.consensus_engine().commit(&result);

    let mut summary = result_summary(&result);
    summary.push(FieldRow::new("Commitment", commitment));
    let report = CommitReport {
        claim_id: result.claim_id,
        commitment,
    };
    emit::<_, FieldRow>(ctx.format, &report, &summary, &[]);

    Ok(())
}
