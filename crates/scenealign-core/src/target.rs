//! The goal state for one positioning run.

use serde::{Deserialize, Serialize};

use crate::transform::Transform;

/// Identifier of a tracked actor in the live scene (label or tag).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        ActorId(id.into())
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the scene should look like: a storyboard panel image or a textual
/// description of the framing.
#[derive(Debug, Clone)]
pub enum SceneReference {
    /// Reference panel image bytes with a human-readable label.
    Image { label: String, data: Vec<u8> },

    /// Free-text description of the target framing.
    Description(String),
}

/// The goal state for one positioning run. Immutable for the run's duration:
/// the controller takes it by reference and never writes through it.
#[derive(Debug, Clone)]
pub struct TargetSpec {
    /// The reference the oracle scores against.
    pub reference: SceneReference,

    /// The actor being positioned.
    pub actor: ActorId,

    /// Known ground-truth transform, set only in self-test scenarios where a
    /// synthetic target exists. Control decisions never read this; it is for
    /// post-hoc validation of how close the loop actually got.
    pub ground_truth: Option<Transform>,
}

impl TargetSpec {
    /// Target described by a storyboard panel image.
    pub fn from_image(actor: ActorId, label: impl Into<String>, data: Vec<u8>) -> Self {
        TargetSpec {
            reference: SceneReference::Image {
                label: label.into(),
                data,
            },
            actor,
            ground_truth: None,
        }
    }

    /// Target described in prose.
    pub fn from_description(actor: ActorId, description: impl Into<String>) -> Self {
        TargetSpec {
            reference: SceneReference::Description(description.into()),
            actor,
            ground_truth: None,
        }
    }

    /// Attach a synthetic ground-truth transform for self-test runs.
    pub fn with_ground_truth(mut self, transform: Transform) -> Self {
        self.ground_truth = Some(transform);
        self
    }
}
