//! Iteration-aware prompt construction.
//!
//! Early iterations ask for aggressive corrections, later ones for
//! fine-tuning; the current transform is embedded numerically so the model
//! reasons about deltas rather than absolute reconstruction.

use scenealign_core::{SceneReference, TargetSpec, Transform};

/// Iterations up to this count ask for aggressive corrections.
const COARSE_ITERATIONS: u32 = 2;

/// Build the evaluation prompt for one iteration.
pub fn build_prompt(target: &TargetSpec, current: &Transform, iteration: u32) -> String {
    let reference = match &target.reference {
        SceneReference::Image { label, .. } => {
            format!("the attached storyboard panel \"{label}\" (first image)")
        }
        SceneReference::Description(description) => format!("this framing: {description}"),
    };

    let pacing = if iteration <= COARSE_ITERATIONS {
        "This is an early pass: be aggressive with corrections."
    } else {
        "Fine-tune the positioning with small adjustments."
    };

    format!(
        r#"Iteration {iteration}: position refinement for actor "{actor}".

CURRENT STATE:
- Position: X={x:.1}, Y={y:.1}, Z={z:.1}
- Rotation: Yaw={yaw:.1}, Pitch={pitch:.1}, Roll={roll:.1}

GOAL:
Match the current scene capture(s) to {reference}.

INSTRUCTIONS:
Compare the scene capture(s) against the goal and propose a relative
correction that moves the actor toward it. Rate the current similarity
(0.0 = very wrong, 1.0 = perfect). {pacing}

Respond ONLY with JSON:
{{
    "similarity": 0.0 to 1.0,
    "description": "brief assessment",
    "adjustments": [
        {{
            "position_delta": {{"x": 0, "y": 0, "z": 0}},
            "rotation_delta": {{"yaw": 0}},
            "confidence": 0.0 to 1.0
        }}
    ]
}}"#,
        actor = target.actor,
        x = current.position.x,
        y = current.position.y,
        z = current.position.z,
        yaw = current.rotation.yaw,
        pitch = current.rotation.pitch,
        roll = current.rotation.roll,
    )
}
