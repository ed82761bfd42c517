use serde::{Deserialize, Serialize};

use crate::property::{Layer, Property};
use crate::scene::SceneParams;
use crate::target::TargetId;
use crate::types::{Color, Vec3};

/// A single, stateless render instruction.
///
/// The core emits a `Vec<RenderCommand>` for every frame. Hosts apply the
/// list in order; each command carries all the data it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RenderCommand {
    /// Write one property of a target on the given layer.
    SetProperty {
        target: TargetId,
        layer: Layer,
        property: Property,
        value: f64,
    },

    /// Remove a previously written property so the target falls back to its
    /// unanimated style.
    ResetProperty {
        target: TargetId,
        layer: Layer,
        property: Property,
    },

    /// Move the document to the eased scroll offset.
    ScrollTo { offset: f64 },

    /// Create the 3D surface with these parameters.
    ConfigureScene { params: SceneParams },

    /// Upload the particle buffers. Sent once, after `ConfigureScene`.
    CreateParticleField {
        positions: Vec<Vec3>,
        colors: Vec<Color>,
        size: f32,
    },

    /// Place the card meshes at their resting positions.
    CreateCards { cards: Vec<CardPlacement> },

    /// Absolute rotation of the particle field, in radians.
    SetFieldRotation { rotation: Vec3 },

    /// Ambient offset of one card relative to its resting placement.
    SetCardTransform {
        index: u32,
        offset: Vec3,
        rotation: Vec3,
    },

    /// Whole-scene fade and zoom, driven by a scroll timeline.
    SetSceneTransform { opacity: f32, scale: f32 },

    /// Release every GPU resource of the scene.
    DestroyScene,

    /// Begin a logical group (one view's output). Hosts may use this for
    /// batching or debugging.
    BeginGroup { id: TargetId },

    /// End the current group.
    EndGroup,
}

/// Resting placement of one card mesh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CardPlacement {
    pub index: u32,
    pub position: Vec3,
    /// Rotation around the vertical axis so the card faces the centre.
    pub rotation_y: f32,
}
