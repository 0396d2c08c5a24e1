//! Position and rotation math for tracked actors.
//!
//! All components are `f64` and the live-scene invariant is that they stay
//! finite. Plain constructors are unchecked for ergonomics; the invariant is
//! enforced at the production boundaries (`Transform::apply`,
//! `SceneState::new`) where a non-finite value would otherwise enter the loop.

use serde::{Deserialize, Serialize};

use crate::error::TransformError;

/// World-space position in scene units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Vec3 { x, y, z }
    }

    /// Whether every component is finite (no NaN, no infinity).
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Euclidean distance to another position.
    pub fn distance(&self, other: &Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

/// Rotation in degrees. Yaw is the component every adjustment carries; pitch
/// and roll default to zero for oracles that only reason about yaw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub yaw: f64,
    #[serde(default)]
    pub pitch: f64,
    #[serde(default)]
    pub roll: f64,
}

impl Rotation {
    pub const IDENTITY: Rotation = Rotation {
        yaw: 0.0,
        pitch: 0.0,
        roll: 0.0,
    };

    pub fn new(yaw: f64, pitch: f64, roll: f64) -> Self {
        Rotation { yaw, pitch, roll }
    }

    /// Yaw-only rotation.
    pub fn yaw(yaw: f64) -> Self {
        Rotation {
            yaw,
            pitch: 0.0,
            roll: 0.0,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.yaw.is_finite() && self.pitch.is_finite() && self.roll.is_finite()
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(yaw {:.1}, pitch {:.1}, roll {:.1})",
            self.yaw, self.pitch, self.roll
        )
    }
}

/// Absolute actor transform: position plus rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Rotation,
}

impl Transform {
    pub fn new(position: Vec3, rotation: Rotation) -> Self {
        Transform { position, rotation }
    }

    /// Position-only transform with identity rotation.
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Transform {
            position: Vec3::new(x, y, z),
            rotation: Rotation::IDENTITY,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite()
    }

    /// Validate the finite invariant, naming the first offending component.
    pub fn ensure_finite(&self) -> Result<(), TransformError> {
        let checks: [(&'static str, f64); 6] = [
            ("position.x", self.position.x),
            ("position.y", self.position.y),
            ("position.z", self.position.z),
            ("rotation.yaw", self.rotation.yaw),
            ("rotation.pitch", self.rotation.pitch),
            ("rotation.roll", self.rotation.roll),
        ];
        for (component, value) in checks {
            if !value.is_finite() {
                return Err(TransformError { component, value });
            }
        }
        Ok(())
    }

    /// Apply a relative position delta and optional rotation delta, returning
    /// the resulting absolute transform. Fails if the result leaves the
    /// finite range.
    pub fn apply(
        &self,
        position_delta: &Vec3,
        rotation_delta: Option<&Rotation>,
    ) -> Result<Transform, TransformError> {
        let mut next = *self;
        next.position.x += position_delta.x;
        next.position.y += position_delta.y;
        next.position.z += position_delta.z;
        if let Some(delta) = rotation_delta {
            next.rotation.yaw += delta.yaw;
            next.rotation.pitch += delta.pitch;
            next.rotation.roll += delta.roll;
        }
        next.ensure_finite()?;
        Ok(next)
    }
}

impl std::fmt::Display for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.position, self.rotation)
    }
}
