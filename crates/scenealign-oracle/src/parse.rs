//! Strict extraction of oracle verdicts from model output.
//!
//! Vision models wrap their JSON in markdown fences or prose more often than
//! not. Extraction is limited to two mechanical steps (fence strip, then
//! brace slice); after that the body either deserializes into a complete
//! verdict or the whole response is classified as malformed. Nothing
//! partially parsed ever reaches the controller.

use serde::Deserialize;

use scenealign_core::{Adjustment, EvaluationError, EvaluationResult, Rotation, Vec3};

/// Response shape the oracle is instructed to emit.
#[derive(Debug, Deserialize)]
struct RawVerdict {
    similarity: Option<f64>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    adjustments: Vec<RawAdjustment>,
}

#[derive(Debug, Deserialize)]
struct RawAdjustment {
    position_delta: Option<RawVec3>,
    rotation_delta: Option<RawRotation>,
    confidence: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawVec3 {
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    z: f64,
}

#[derive(Debug, Default, Deserialize)]
struct RawRotation {
    #[serde(default)]
    yaw: f64,
    #[serde(default)]
    pitch: f64,
    #[serde(default)]
    roll: f64,
}

fn malformed(reason: impl Into<String>) -> EvaluationError {
    EvaluationError::Malformed {
        reason: reason.into(),
    }
}

/// Slice the JSON body out of surrounding prose or a markdown fence.
fn extract_json(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let rest = &text[start + 7..];
        if let Some(end) = rest.find("```") {
            return Some(rest[..end].trim());
        }
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(text[start..=end].trim())
}

/// Parse a raw model response into a well-formed verdict, or classify it as
/// malformed. Requirements: a `similarity` number, at least one adjustment,
/// and that adjustment carrying at least one delta.
pub fn parse_verdict(response: &str) -> Result<EvaluationResult, EvaluationError> {
    let body = extract_json(response).ok_or_else(|| malformed("no JSON object in response"))?;
    let raw: RawVerdict =
        serde_json::from_str(body).map_err(|e| malformed(format!("invalid JSON: {e}")))?;

    let similarity = raw
        .similarity
        .ok_or_else(|| malformed("missing similarity"))?;
    let first = raw
        .adjustments
        .into_iter()
        .next()
        .ok_or_else(|| malformed("missing adjustments"))?;

    if first.position_delta.is_none() && first.rotation_delta.is_none() {
        return Err(malformed("adjustment carries no deltas"));
    }

    let position = first.position_delta.unwrap_or_default();
    let mut adjustment = Adjustment {
        position_delta: Vec3::new(position.x, position.y, position.z),
        rotation_delta: first
            .rotation_delta
            .map(|r| Rotation::new(r.yaw, r.pitch, r.roll)),
        confidence: first.confidence,
    };
    if let Some(confidence) = adjustment.confidence {
        if !confidence.is_finite() {
            adjustment.confidence = None;
        }
    }

    let result = EvaluationResult::new(similarity, adjustment)?;
    Ok(match raw.description {
        Some(description) => result.with_rationale(description),
        None => result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = r#"{
        "similarity": 0.55,
        "description": "Cube sits left of the panel framing",
        "adjustments": [
            {
                "actor": "Cube",
                "position_delta": {"x": -120.0, "y": 40.0, "z": 0.0},
                "rotation_delta": {"yaw": -15.0},
                "confidence": 0.8
            }
        ]
    }"#;

    #[test]
    fn test_parses_bare_json() {
        let result = parse_verdict(WELL_FORMED).expect("well-formed");
        assert_eq!(result.similarity(), 0.55);
        assert_eq!(result.adjustment().position_delta.x, -120.0);
        assert_eq!(
            result.adjustment().rotation_delta.expect("rotation").yaw,
            -15.0
        );
        assert_eq!(result.adjustment().confidence, Some(0.8));
        assert_eq!(
            result.rationale(),
            Some("Cube sits left of the panel framing")
        );
    }

    #[test]
    fn test_parses_fenced_json() {
        let fenced = format!("Here is my assessment:\n```json\n{WELL_FORMED}\n```\nDone.");
        let result = parse_verdict(&fenced).expect("fenced");
        assert_eq!(result.similarity(), 0.55);
    }

    #[test]
    fn test_parses_prose_wrapped_json() {
        let wrapped = format!("The scene is close but not there yet. {WELL_FORMED} Hope that helps!");
        let result = parse_verdict(&wrapped).expect("prose-wrapped");
        assert_eq!(result.similarity(), 0.55);
    }

    #[test]
    fn test_missing_similarity_is_malformed() {
        let response = r#"{"adjustments": [{"position_delta": {"x": 1.0, "y": 0.0, "z": 0.0}}]}"#;
        let err = parse_verdict(response).expect_err("missing score");
        assert!(matches!(err, EvaluationError::Malformed { .. }));
    }

    #[test]
    fn test_empty_adjustments_is_malformed() {
        let response = r#"{"similarity": 0.4, "adjustments": []}"#;
        let err = parse_verdict(response).expect_err("no adjustment");
        assert!(matches!(err, EvaluationError::Malformed { .. }));
    }

    #[test]
    fn test_adjustment_without_deltas_is_malformed() {
        let response = r#"{"similarity": 0.4, "adjustments": [{"confidence": 0.9}]}"#;
        let err = parse_verdict(response).expect_err("no deltas");
        assert!(matches!(err, EvaluationError::Malformed { .. }));
    }

    #[test]
    fn test_no_json_at_all_is_malformed() {
        let err = parse_verdict("I cannot rate this image.").expect_err("prose only");
        assert!(matches!(err, EvaluationError::Malformed { .. }));
    }

    #[test]
    fn test_truncated_json_is_malformed() {
        let response = r#"{"similarity": 0.4, "adjustments": [{"position_delta": {"x": 1}"#;
        let err = parse_verdict(response).expect_err("truncated");
        assert!(matches!(err, EvaluationError::Malformed { .. }));
    }

    #[test]
    fn test_rotation_only_adjustment_parses() {
        let response = r#"{"similarity": 0.7, "adjustments": [{"rotation_delta": {"yaw": 30.0}}]}"#;
        let result = parse_verdict(response).expect("rotation-only");
        assert_eq!(result.adjustment().position_delta, Vec3::ZERO);
        assert_eq!(result.adjustment().rotation_delta.expect("rotation").yaw, 30.0);
    }

    #[test]
    fn test_partial_position_delta_defaults_missing_axes() {
        let response = r#"{"similarity": 0.6, "adjustments": [{"position_delta": {"x": -50.0}}]}"#;
        let result = parse_verdict(response).expect("partial delta");
        assert_eq!(result.adjustment().position_delta, Vec3::new(-50.0, 0.0, 0.0));
    }

    #[test]
    fn test_extra_adjustments_use_first() {
        let response = r#"{
            "similarity": 0.5,
            "adjustments": [
                {"position_delta": {"x": 1.0, "y": 0.0, "z": 0.0}},
                {"position_delta": {"x": 99.0, "y": 0.0, "z": 0.0}}
            ]
        }"#;
        let result = parse_verdict(response).expect("multiple adjustments");
        assert_eq!(result.adjustment().position_delta.x, 1.0);
    }
}
