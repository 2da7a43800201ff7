// crates/verity-cli/src/commands/predict.rs
//
// `verity predict`: project a participant's accuracy trend forward.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use verity_core::AccuracyRecord;
use verity_reputation::{TrendFallback, TrendPrediction};

use super::{read_json, Context};
use crate::output::{emit, FieldRow};

/// Trend prediction command.
#[derive(Debug, Args)]
pub struct PredictCmd {
    /// JSON array of accuracy records ("-" for stdin).
    #[arg(long)]
    pub input: PathBuf,

    /// Days past now to project to. Defaults to `trend_days_ahead` from the config.
    #[arg(long)]
    pub days: Option<f64>,
}

#[derive(Debug, Serialize)]
struct PredictReport {
    days_ahead: f64,
    history_points: usize,
    #[serde(flatten)]
    prediction: TrendPrediction,
}

/// Run the predict command.
pub async fn run(cmd: &PredictCmd, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let history: Vec<AccuracyRecord> = read_json(&cmd.input)?;
    let engine = ctx.reputation_engine();
    let days_ahead = cmd.days.unwrap_or(engine.config().trend_days_ahead);

    let prediction = engine.predict_trend(&history, days_ahead);
    let method = match prediction.fallback {
        None => "linear projection".to_string(),
        Some(TrendFallback::InsufficientHistory { points }) => {
            format!("last known score ({} points)", points)
        }
        Some(TrendFallback::Degenerate) => "last known score (degenerate fit)".to_string(),
    };

    let report = PredictReport {
        days_ahead,
        history_points: history.len(),
        prediction,
    };
    let summary = vec![
        FieldRow::new("Predicted score", report.prediction.score),
        FieldRow::new("Days ahead", report.days_ahead),
        FieldRow::new("History points", report.history_points),
        FieldRow::new("Method", method),
    ];
    emit::<_, FieldRow>(ctx.format, &report, &summary, &[]);

    Ok(())
}
