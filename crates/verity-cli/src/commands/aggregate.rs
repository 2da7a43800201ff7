// crates/verity-cli/src/commands/aggregate.rs
//
// `verity aggregate`: decide a claim from an already-collected opinion set.

use std::path::PathBuf;

use clap::Args;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use verity_consensus::ConsensusCommitment;
use verity_core::{ConsensusResult, Opinion};

use super::{read_json, Context};
use crate::output::{emit, FieldRow};

/// Claim aggregation command.
#[derive(Debug, Args)]
pub struct AggregateCmd {
    /// JSON file with `claim_id` and `opinions` ("-" for stdin).
    #[arg(long)]
    pub input: PathBuf,

    /// Also print the consensus commitment.
    #[arg(long)]
    pub commit: bool,
}

#[derive(Debug, Deserialize)]
struct AggregateInput {
    claim_id: String,
    opinions: Vec<Opinion>,
}

#[derive(Debug, Serialize)]
struct AggregateReport {
    #[serde(flatten)]
    result: ConsensusResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    commitment: Option<ConsensusCommitment>,
}

#[derive(Tabled)]
struct OpinionRow {
    #[tabled(rename = "Validator")]
    validator: String,
    #[tabled(rename = "Vote")]
    vote: &'static str,
    #[tabled(rename = "Trust")]
    trust: u32,
    #[tabled(rename = "Timestamp")]
    timestamp: String,
}

impl OpinionRow {
    fn from_opinion(opinion: &Opinion) -> Self {
        Self {
            validator: opinion.validator_id.to_string(),
            vote: if opinion.result { "true" } else { "false" },
            trust: opinion.trust_score.value(),
            timestamp: opinion.timestamp.to_rfc3339(),
        }
    }
}

pub(crate) fn result_summary(result: &ConsensusResult) -> Vec<FieldRow> {
    vec![
        FieldRow::new("Claim", &result.claim_id),
        FieldRow::new("Status", result.status),
        FieldRow::new("Accepted", result.accepted),
        FieldRow::new("Weighted for", result.weighted_for),
        FieldRow::new("Weighted against", result.weighted_against),
        FieldRow::new("Ratio", format!("{:.4}", result.ratio)),
        FieldRow::new("Opinions", result.opinions.len()),
    ]
}

/// Run the aggregate command.
pub async fn run(cmd: &AggregateCmd, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let input: AggregateInput = read_json(&cmd.input)?;
    let config = ctx.config.consensus_config();

    let engine = ctx.consensus_engine();
    let result = engine.aggregate(&input.claim_id, &input.opinions, &config)?;
    let commitment = cmd.commit.then(|| engine.commit(&result));

    let mut summary = result_summary(&result);
    if let Some(c) = &commitment {
        summary.push(FieldRow::new("Commitment", c));
    }
    let rows: Vec<OpinionRow> = result.opinions.iter().map(OpinionRow::from_opinion).collect();

    let report = AggregateReport { result, commitment };
    emit(ctx.format, &report, &summary, &rows);

    Ok(())
}
