use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

const PLANNER_TARGET: &str = "courtmix_core::planner";
const GENERATOR_TARGET: &str = "courtmix_core::generator";

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse telemetry JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize)]
pub struct TelemetrySummary {
    pub planned: PlannedTelemetrySummary,
    pub rollouts: RolloutTelemetrySummary,
    pub generator: GeneratorTelemetrySummary,
}

/// Winning rollouts, one per planned round.
#[derive(Debug, Default, Serialize)]
pub struct PlannedTelemetrySummary {
    pub count: usize,
    pub avg_trials: Option<f64>,
    pub avg_truncated: Option<f64>,
    pub avg_partner: Option<f64>,
    pub avg_opponent: Option<f64>,
    pub with_duplicates: usize,
    pub depth_counts: BTreeMap<String, usize>,
}

/// Every scored rollout, winners included. Only present at DEBUG.
#[derive(Debug, Default, Serialize)]
pub struct RolloutTelemetrySummary {
    pub count: usize,
    pub avg_partner: Option<f64>,
    pub avg_opponent: Option<f64>,
}

#[derive(Debug, Default, Serialize)]
pub struct GeneratorTelemetrySummary {
    pub discarded_matchings: usize,
    pub recomputed_heuristics: usize,
}

#[derive(Debug)]
struct Average {
    sum: f64,
    count: usize,
}

impl Average {
    fn new() -> Self {
        Self { sum: 0.0, count: 0 }
    }

    fn add(&mut self, value: Option<f64>) {
        if let Some(value) = value {
            self.sum += value;
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

/// Aggregate planner and generator events from a JSON telemetry log.
pub fn summarise_telemetry(path: &Path) -> Result<TelemetrySummary, TelemetryError> {
    if !path.exists() {
        return Ok(TelemetrySummary::default());
    }

    let file = File::open(path).map_err(|source| TelemetryError::Io {
        context: "opening telemetry log",
        source,
    })?;
    let reader = BufReader::new(file);

    let mut summary = TelemetrySummary::default();
    let mut trials_avg = Average::new();
    let mut truncated_avg = Average::new();
    let mut planned_partner_avg = Average::new();
    let mut planned_opponent_avg = Average::new();
    let mut rollout_partner_avg = Average::new();
    let mut rollout_opponent_avg = Average::new();

    for line in reader.lines() {
        let line = line.map_err(|source| TelemetryError::Io {
            context: "reading telemetry line",
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }

        let payload: Value = serde_json::from_str(&line)?;
        let target = payload
            .get("target")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let fields = payload
            .get("fields")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let message = fields
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default();

        match (target, message) {
            (PLANNER_TARGET, "next round planned") => {
                let planned = &mut summary.planned;
                planned.count += 1;
                trials_avg.add(number(&fields, "trials"));
                truncated_avg.add(number(&fields, "truncated"));
                planned_partner_avg.add(number(&fields, "partner"));
                planned_opponent_avg.add(number(&fields, "opponent"));
                if number(&fields, "duplicates").is_some_and(|value| value > 0.0) {
                    planned.with_duplicates += 1;
                }
                let depth = fields
                    .get("depth")
                    .and_then(Value::as_u64)
                    .map_or_else(|| "<unset>".to_string(), |depth| depth.to_string());
                *planned.depth_counts.entry(depth).or_insert(0) += 1;
            }
            (PLANNER_TARGET, "rollout scored") => {
                summary.rollouts.count += 1;
                rollout_partner_avg.add(number(&fields, "partner"));
                rollout_opponent_avg.add(number(&fields, "opponent"));
            }
            (GENERATOR_TARGET, "matcher attempt discarded") => {
                summary.generator.discarded_matchings += 1;
            }
            (GENERATOR_TARGET, message) if message.contains("recomputing") => {
                summary.generator.recomputed_heuristics += 1;
            }
            _ => {}
        }
    }

    summary.planned.avg_trials = trials_avg.mean();
    summary.planned.avg_truncated = truncated_avg.mean();
    summary.planned.avg_partner = planned_partner_avg.mean();
    summary.planned.avg_opponent = planned_opponent_avg.mean();
    summary.rollouts.avg_partner = rollout_partner_avg.mean();
    summary.rollouts.avg_opponent = rollout_opponent_avg.mean();

    Ok(summary)
}

fn number(fields: &Map<String, Value>, key: &str) -> Option<f64> {
    fields.get(key).and_then(Value::as_f64)
}

pub fn write_summary_outputs(
    telemetry_path: &Path,
    output_dir: &Path,
) -> Result<Option<TelemetryOutputs>, TelemetryError> {
    if !telemetry_path.exists() {
        return Ok(None);
    }

    let summary = summarise_telemetry(telemetry_path)?;
    let json_path = output_dir.join("telemetry_summary.json");
    let md_path = output_dir.join("telemetry_summary.md");

    std::fs::write(
        &json_path,
        serde_json::to_vec_pretty(&summary).map_err(TelemetryError::from)?,
    )
    .map_err(|source| TelemetryError::Io {
        context: "writing telemetry summary json",
        source,
    })?;

    let markdown = render_markdown(&summary, telemetry_path);
    std::fs::write(&md_path, markdown).map_err(|source| TelemetryError::Io {
        context: "writing telemetry summary markdown",
        source,
    })?;

    Ok(Some(TelemetryOutputs {
        summary,
        json_path,
        markdown_path: md_path,
    }))
}

pub fn append_highlights_to_markdown(
    summary_path: &Path,
    outputs: &TelemetryOutputs,
) -> Result<(), TelemetryError> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(summary_path)
        .map_err(|source| TelemetryError::Io {
            context: "opening summary markdown for telemetry append",
            source,
        })?;

    let mut section = String::new();
    section.push_str("\n## Telemetry Highlights\n");
    let planned = &outputs.summary.planned;
    section.push_str(&format!("- Planned rounds captured: {}\n", planned.count));
    if let Some(value) = planned.avg_trials {
        section.push_str(&format!("- Avg rollouts per round: {:.2}\n", value));
    }
    if let Some(value) = planned.avg_truncated {
        section.push_str(&format!("- Avg truncated rollouts: {:.2}\n", value));
    }
    if let Some(value) = planned.avg_partner {
        section.push_str(&format!("- Avg winning partner score: {:.2}\n", value));
    }
    section.push_str(&format!(
        "- Rounds forced into a repeat match: {}\n",
        planned.with_duplicates
    ));

    let generator = &outputs.summary.generator;
    section.push_str("\n### Generator\n");
    section.push_str(&format!(
        "- Discarded matchings: {}\n- Heuristics recomputed: {}\n",
        generator.discarded_matchings, generator.recomputed_heuristics
    ));

    write!(file, "{section}").map_err(|source| TelemetryError::Io {
        context: "writing telemetry highlights",
        source,
    })?;

    Ok(())
}

fn render_markdown(summary: &TelemetrySummary, telemetry_path: &Path) -> String {
    let mut output = String::new();
    output.push_str("# Telemetry Summary\n\n");
    output.push_str(&format!("- Source: `{}`\n", telemetry_path.display()));
    output.push('\n');

    output.push_str("## Planned Rounds\n");
    output.push_str(&format!("- Events: {}\n", summary.planned.count));
    if let Some(value) = summary.planned.avg_trials {
        output.push_str(&format!("- Avg rollouts: {:.2}\n", value));
    }
    if let Some(value) = summary.planned.avg_truncated {
        output.push_str(&format!("- Avg truncated: {:.2}\n", value));
    }
    if let Some(value) = summary.planned.avg_partner {
        output.push_str(&format!("- Avg partner score: {:.2}\n", value));
    }
    if let Some(value) = summary.planned.avg_opponent {
        output.push_str(&format!("- Avg opponent score: {:.3}\n", value));
    }
    output.push_str(&format!(
        "- With duplicates: {}\n",
        summary.planned.with_duplicates
    ));
    if !summary.planned.depth_counts.is_empty() {
        output.push_str("- Winning depth:\n");
        for (depth, count) in &summary.planned.depth_counts {
            output.push_str(&format!("  - {}: {}\n", depth, count));
        }
    }
    output.push('\n');

    output.push_str("## Rollouts\n");
    if summary.rollouts.count == 0 {
        output.push_str("- <none> (enable debug level)\n");
    } else {
        output.push_str(&format!("- Scored: {}\n", summary.rollouts.count));
        if let Some(value) = summary.rollouts.avg_partner {
            output.push_str(&format!("- Avg partner score: {:.2}\n", value));
        }
        if let Some(value) = summary.rollouts.avg_opponent {
            output.push_str(&format!("- Avg opponent score: {:.3}\n", value));
        }
    }
    output
}

#[derive(Debug)]
pub struct TelemetryOutputs {
    pub summary: TelemetrySummary,
    pub json_path: PathBuf,
    pub markdown_path: PathBuf,
}
