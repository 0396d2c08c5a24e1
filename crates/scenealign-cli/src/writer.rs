//! Iteration-log file writer.
//!
//! Persists a finished run as the JSON document operators and downstream
//! tooling read: a summary block plus one wire-format entry per iteration
//! (`iteration`, `similarity`, `position`, `rotation`, `timestamp` — names
//! and order are load-bearing).

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use scenealign_core::{RunReport, WireRecord};

#[derive(Debug, Serialize)]
struct Summary {
    run_id: String,
    outcome: String,
    total_iterations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    final_similarity: Option<f64>,
    duration_ms: u64,
}

#[derive(Debug, Serialize)]
struct LogDocument {
    summary: Summary,
    iterations: Vec<WireRecord>,
}

/// Write a run's iteration log to `path` as pretty-printed JSON.
pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    let document = LogDocument {
        summary: Summary {
            run_id: report.run_id.clone(),
            outcome: report.outcome.to_string(),
            total_iterations: report.iterations(),
            final_similarity: report.final_similarity(),
            duration_ms: report.duration_ms,
        },
        iterations: report.records.iter().map(|r| r.to_wire()).collect(),
    };

    let file = File::create(path)
        .with_context(|| format!("failed to create iteration log {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &document)
        .with_context(|| format!("failed to write iteration log {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenealign_core::{
        Adjustment, EvaluationResult, IterationLog, RunOutcome, SceneState, Transform,
    };
    use scenealign_core::{CaptureImage, Resolution, ViewAngle};

    fn report() -> RunReport {
        let mut log = IterationLog::new();
        for (i, similarity) in [0.3, 0.88].iter().enumerate() {
            let state = SceneState::new(
                Transform::at(10.0 * i as f64, 0.0, 100.0),
                vec![CaptureImage {
                    angle: ViewAngle::Front,
                    resolution: Resolution::default(),
                    data: vec![i as u8],
                }],
            )
            .expect("state");
            log.push(
                state.snapshot_digest().clone(),
                EvaluationResult::new(*similarity, Adjustment::zero()).expect("result"),
                Transform::at(10.0 * i as f64, 0.0, 100.0),
                25,
            );
        }
        RunReport {
            run_id: "run-test".to_string(),
            outcome: RunOutcome::Converged,
            records: log.into_records(),
            duration_ms: 50,
        }
    }

    #[test]
    fn test_written_log_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("iteration_log.json");

        write_report(&path, &report()).expect("write");

        let raw = std::fs::read_to_string(&path).expect("read back");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("valid JSON");

        assert_eq!(value["summary"]["outcome"], "converged");
        assert_eq!(value["summary"]["total_iterations"], 2);
        assert_eq!(value["summary"]["final_similarity"], 0.88);

        let iterations = value["iterations"].as_array().expect("iterations array");
        assert_eq!(iterations.len(), 2);
        assert_eq!(iterations[0]["iteration"], 1);
        assert_eq!(iterations[1]["similarity"], 0.88);
        assert_eq!(iterations[1]["position"]["x"], 10.0);
        assert!(iterations[0]["rotation"]["yaw"].is_number());
        assert!(iterations[0]["timestamp"].is_string());
    }

    #[test]
    fn test_wire_field_order_preserved_in_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("iteration_log.json");
        write_report(&path, &report()).expect("write");

        let raw = std::fs::read_to_string(&path).expect("read back");
        let entry = raw
            .split("\"iterations\"")
            .nth(1)
            .expect("iterations section");
        let iteration = entry.find("\"iteration\"").expect("iteration");
        let similarity = entry.find("\"similarity\"").expect("similarity");
        let position = entry.find("\"position\"").expect("position");
        let rotation = entry.find("\"rotation\"").expect("rotation");
        let timestamp = entry.find("\"timestamp\"").expect("timestamp");
        assert!(iteration < similarity && similarity < position);
        assert!(position < rotation && rotation < timestamp);
    }
}
