// crates/verity-cli/src/commands/collusion.rs
//
// `verity collusion`: look for validators voting in lockstep across past
// consensus results.

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::Args;
use tabled::Tabled;

use verity_core::{ConsensusResult, ValidatorId};

use super::{read_json, Context};
use crate::output::{emit, FieldRow};

/// Collusion check command.
#[derive(Debug, Args)]
pub struct CollusionCmd {
    /// JSON array of past consensus results ("-" for stdin).
    #[arg(long)]
    pub input: PathBuf,

    /// Comma-separated validators to check. Defaults to every validator
    /// that appears in the results.
    #[arg(long, value_delimiter = ',')]
    pub validators: Vec<String>,
}

#[derive(Tabled)]
struct PairRow {
    #[tabled(rename = "First")]
    first: String,
    #[tabled(rename = "Second")]
    second: String,
    #[tabled(rename = "Correlation")]
    correlation: String,
    #[tabled(rename = "Shared claims")]
    shared_claims: usize,
}

/// Run the collusion command.
pub async fn run(cmd: &CollusionCmd, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let results: Vec<ConsensusResult> = read_json(&cmd.input)?;

    let candidates: Vec<ValidatorId> = if cmd.validators.is_empty() {
        let seen: BTreeSet<&ValidatorId> = results
            .iter()
            .flat_map(|r| r.opinions.iter().map(|o| &o.validator_id))
            .collect();
        seen.into_iter().cloned().collect()
    } else {
        cmd.validators.iter().map(|v| ValidatorId::new(v.trim())).collect()
    };

    let report = ctx.consensus_engine().detect_collusion(&results, &candidates);

    let suspects: Vec<&str> = report.suspects.iter().map(|s| s.as_str()).collect();
    let summary = vec![
        FieldRow::new("Results", results.len()),
        FieldRow::new("Candidates", candidates.len()),
        FieldRow::new("Detected", report.detected),
        FieldRow::new("Probability", format!("{:.4}", report.probability)),
        FieldRow::new(
            "Suspects",
            if suspects.is_empty() {
                "-".to_string()
            } else {
                suspects.join(", ")
            },
        ),
    ];
    let rows: Vec<PairRow> = report
        .pairs
        .iter()
        .map(|p| PairRow {
            first: p.first.to_string(),
            second: p.second.to_string(),
            correlation: format!("{:.4}", p.correlation),
            shared_claims: p.shared_claims,
        })
        .collect();
    emit(ctx.format, &report, &summary, &rows);

    Ok(())
}
