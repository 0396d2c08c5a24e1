//! Capture requests and the immutable scene snapshot.
//!
//! A `SceneState` is produced by the renderer once per iteration and never
//! mutated afterwards; downstream code holds it by reference or archives its
//! `SnapshotDigest` into the iteration log.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CaptureError, TransformError};
use crate::transform::Transform;

/// Named viewpoints the renderer knows how to frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ViewAngle {
    Front,
    Right,
    Back,
    Left,
    Top,
    FrontThreeQuarter,
}

impl ViewAngle {
    /// Label used in capture filenames and prompt text.
    pub fn label(&self) -> &'static str {
        match self {
            ViewAngle::Front => "front",
            ViewAngle::Right => "right",
            ViewAngle::Back => "back",
            ViewAngle::Left => "left",
            ViewAngle::Top => "top",
            ViewAngle::FrontThreeQuarter => "front_three_quarter",
        }
    }

    /// The full capture set, in presentation order.
    pub fn all() -> Vec<ViewAngle> {
        vec![
            ViewAngle::Front,
            ViewAngle::Right,
            ViewAngle::Back,
            ViewAngle::Left,
            ViewAngle::Top,
            ViewAngle::FrontThreeQuarter,
        ]
    }
}

/// Capture resolution in pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Resolution { width, height }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution {
            width: 1280,
            height: 720,
        }
    }
}

/// What to capture on each iteration: an ordered sequence of viewpoints at a
/// fixed resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptureSpec {
    /// Viewpoints, captured in order.
    pub angles: Vec<ViewAngle>,

    /// Resolution for every capture.
    pub resolution: Resolution,
}

impl Default for CaptureSpec {
    fn default() -> Self {
        CaptureSpec {
            angles: vec![ViewAngle::Front],
            resolution: Resolution::default(),
        }
    }
}

impl CaptureSpec {
    /// Capture all known viewpoints.
    pub fn all_angles() -> Self {
        CaptureSpec {
            angles: ViewAngle::all(),
            resolution: Resolution::default(),
        }
    }
}

/// One captured image with its viewpoint metadata.
#[derive(Debug, Clone)]
pub struct CaptureImage {
    /// The viewpoint this image was framed from.
    pub angle: ViewAngle,

    /// Actual capture resolution.
    pub resolution: Resolution,

    /// Encoded image bytes (PNG from the live renderer, synthetic in fakes).
    pub data: Vec<u8>,
}

/// SHA-256 digest over a snapshot's image bytes, used as the iteration log's
/// scene-state reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotDigest(String);

impl SnapshotDigest {
    fn from_images(images: &[CaptureImage]) -> Self {
        let mut hasher = Sha256::new();
        for image in images {
            hasher.update(image.angle.label().as_bytes());
            hasher.update(b"\n");
            hasher.update(&image.data);
        }
        SnapshotDigest(hex::encode(hasher.finalize()))
    }

    /// Return the full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl std::fmt::Display for SnapshotDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable snapshot of the scene at capture time.
///
/// Guarantees:
/// - The transform is finite.
/// - There is at least one image.
/// - Contents never change after construction (fields are private).
#[derive(Debug, Clone)]
pub struct SceneState {
    transform: Transform,
    images: Vec<CaptureImage>,
    digest: SnapshotDigest,
}

impl SceneState {
    /// Build a snapshot, validating the finite invariant and rejecting empty
    /// captures.
    pub fn new(transform: Transform, images: Vec<CaptureImage>) -> Result<Self, CaptureError> {
        transform
            .ensure_finite()
            .map_err(|e: TransformError| CaptureError::Renderer(e.to_string()))?;
        if images.is_empty() {
            return Err(CaptureError::EmptyCapture(
                "renderer returned no images".to_string(),
            ));
        }
        let digest = SnapshotDigest::from_images(&images);
        Ok(SceneState {
            transform,
            images,
            digest,
        })
    }

    /// The actor transform at capture time.
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Captured images, in the order requested by the `CaptureSpec`.
    pub fn images(&self) -> &[CaptureImage] {
        &self.images
    }

    /// Content digest over the image bytes.
    pub fn snapshot_digest(&self) -> &SnapshotDigest {
        &self.digest
    }
}
