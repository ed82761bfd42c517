use serde::{Deserialize, Serialize};

/// Post-processing stack for the particle scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PostProcessing {
    /// Bloom, film noise and vignette.
    Full {
        bloom_threshold: f32,
        bloom_intensity: f32,
        noise_opacity: f32,
    },
    /// A single bloom pass.
    Reduced {
        bloom_threshold: f32,
        bloom_intensity: f32,
    },
    Disabled,
}

impl PostProcessing {
    /// Number of full-screen passes the renderer runs.
    pub fn passes(&self) -> u32 {
        match self {
            Self::Full { .. } => 3,
            Self::Reduced { .. } => 1,
            Self::Disabled => 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.passes() > 0
    }
}

/// Renderer parameters derived from the device profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SceneParams {
    pub particle_count: u32,
    pub particle_size: f32,
    /// Edge length of the cube the particles are scattered in.
    pub field_spread: f32,
    pub camera_distance: f32,
    /// Vertical field of view in degrees.
    pub field_of_view: f32,
    pub near: f32,
    pub far: f32,
    pub post_processing: PostProcessing,
    pub antialias: bool,
    pub device_pixel_ratio: f64,
}

impl SceneParams {
    pub fn effects_enabled(&self) -> bool {
        self.post_processing.is_enabled()
    }
}
