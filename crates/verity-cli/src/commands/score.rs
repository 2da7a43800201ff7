// crates/verity-cli/src/commands/score.rs
//
// `verity score`: full trust recompute from a participant's raw factors.

use std::path::PathBuf;

use clap::Args;
use serde::{Deserialize, Serialize};

use verity_core::{AccuracyRecord, ParticipantId, TrustScore, TrustWeights};

use super::{read_json, Context};
use crate::output::{emit, FieldRow};

/// Trust score computation command.
#[derive(Debug, Args)]
pub struct ScoreCmd {
    /// JSON file with the participant's trust factors ("-" for stdin).
    #[arg(long)]
    pub input: PathBuf,
}

/// Missing factors default to the neutral 500.
#[derive(Debug, Deserialize)]
struct ScoreInput {
    #[serde(default)]
    participant: Option<ParticipantId>,
    #[serde(default)]
    base: TrustScore,
    #[serde(default)]
    accuracy_history: Vec<AccuracyRecord>,
    #[serde(default)]
    consistency_factor: TrustScore,
    #[serde(default)]
    validation_rate: TrustScore,
    /// Overrides the configured weights.
    #[serde(default)]
    weights: Option<TrustWeights>,
}

#[derive(Debug, Serialize)]
struct ScoreReport {
    participant: Option<ParticipantId>,
    score: TrustScore,
    previous: TrustScore,
    accuracy_factor: f64,
    consistency_factor: TrustScore,
    validation_rate: TrustScore,
    weights: TrustWeights,
    history_points: usize,
}

/// Run the score command.
pub async fn run(cmd: &ScoreCmd, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let input: ScoreInput = read_json(&cmd.input)?;
    let engine = ctx.reputation_engine();
    let weights = input.weights.unwrap_or(engine.config().weights);

    let score = engine.calculate_trust_score(
        input.base,
        &input.accuracy_history,
        input.consistency_factor,
        input.validation_rate,
        &weights,
    );

    let report = ScoreReport {
        participant: input.participant,
        score,
        previous: input.base,
        accuracy_factor: engine.accuracy_factor(&input.accuracy_history),
        consistency_factor: input.consistency_factor,
        validation_rate: input.validation_rate,
        weights: weights.normalized(),
        history_points: input.accuracy_history.len(),
    };

    let summary = vec![
        FieldRow::new(
            "Participant",
            report.participant.as_ref().map(|p| p.as_str()).unwrap_or("-"),
        ),
        FieldRow::new("Trust score", report.score),
        FieldRow::new("Previous", report.previous),
        FieldRow::new("Accuracy factor", format!("{:.1}", report.accuracy_factor)),
        FieldRow::new("Consistency", report.consistency_factor),
        FieldRow::new("Validation rate", report.validation_rate),
        FieldRow::new(
            "Weights",
            format!(
                "{:.3} / {:.3} / {:.3}",
                report.weights.accuracy, report.weights.consistency, report.weights.validation
            ),
        ),
        FieldRow::new("History points", report.history_points),
    ];
    emit::<_, FieldRow>(ctx.format, &report, &summary, &[]);

    Ok(())
}
