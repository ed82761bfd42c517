//! Particle scene driver.
//!
//! The scene is built lazily: construction waits until the host reports a
//! ready surface and at least one frame has already rendered, so the page
//! paints before the expensive field is generated. Once built it free-runs
//! ambient motion off the frame clock; its overall opacity and scale come
//! from outside (a scroll timeline bound to the scene container).

mod field;
mod params;

pub use field::{ParticleField, card_float, card_layout, particle_field};
pub use params::scene_params;

use folio_protocol::{DeviceProfile, RenderCommand, SceneParams, TargetId, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SceneTuning;
use crate::host::SurfaceStatus;

#[derive(Debug, Error, PartialEq)]
pub enum SceneError {
    #[error("scene parameter {field} is unusable: {value}")]
    Params { field: &'static str, value: f64 },
    #[error("invalid frame delta: {0}")]
    InvalidDelta(f64),
}

/// Where a view hosts the 3D scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSpec {
    /// Element the canvas lives in; timelines on it drive the scene's
    /// presentation.
    pub container: TargetId,
    /// Placeholder pulsing while the scene is not built yet.
    #[serde(default)]
    pub loader: Option<TargetId>,
    /// Number of floating project cards around the field.
    #[serde(default)]
    pub cards: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SceneStatus {
    /// Waiting for the surface and the first rendered frame.
    Pending,
    Ready,
    /// The surface could not be created or the build failed; the scene is
    /// skipped.
    Disabled,
    TornDown,
}

#[derive(Debug)]
pub struct SceneDriver {
    params: SceneParams,
    tuning: SceneTuning,
    spec: SceneSpec,
    status: SceneStatus,
    frames_seen: u64,
    elapsed: f32,
    rotation: glam::Vec3,
    /// Opacity and scale requested by the timeline.
    presentation: (f32, f32),
    /// Presentation last sent to the host.
    shown: Option<(f32, f32)>,
}

impl SceneDriver {
    pub fn new(
        spec: SceneSpec,
        profile: &DeviceProfile,
        tuning: SceneTuning,
        device_pixel_ratio: f64,
    ) -> Self {
        let params = scene_params(profile, &tuning, device_pixel_ratio);
        tracing::debug!(
            particles = params.particle_count,
            passes = params.post_processing.passes(),
            "scene configured"
        );
        Self {
            params,
            tuning,
            spec,
            status: SceneStatus::Pending,
            frames_seen: 0,
            elapsed: 0.0,
            rotation: glam::Vec3::ZERO,
            presentation: (1.0, 1.0),
            shown: None,
        }
    }

    pub fn params(&self) -> &SceneParams {
        &self.params
    }

    pub fn spec(&self) -> &SceneSpec {
        &self.spec
    }

    pub fn status(&self) -> SceneStatus {
        self.status
    }

    pub fn container(&self) -> &TargetId {
        &self.spec.container
    }

    /// Current field rotation in radians.
    pub fn rotation(&self) -> Vec3 {
        Vec3::new(self.rotation.x, self.rotation.y, self.rotation.z)
    }

    /// Advance one frame. Returns the new status when it changed.
    pub fn advance(
        &mut self,
        dt: f64,
        surface: &SurfaceStatus,
        out: &mut Vec<RenderCommand>,
    ) -> Result<Option<SceneStatus>, SceneError> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(SceneError::InvalidDelta(dt));
        }
        match self.status {
            SceneStatus::Pending => {
                let rendered_before = self.frames_seen > 0;
                self.frames_seen += 1;
                match surface {
                    SurfaceStatus::Failed(reason) => {
                        tracing::warn!(%reason, "3D surface unavailable, skipping the scene");
                        self.status = SceneStatus::Disabled;
                        Ok(Some(self.status))
                    }
                    SurfaceStatus::Ready if rendered_before => {
                        if let Err(e) = self.build(out) {
                            tracing::warn!(error = %e, "scene build failed, skipping the scene");
                            self.status = SceneStatus::Disabled;
                        }
                        Ok(Some(self.status))
                    }
                    _ => Ok(None),
                }
            }
            SceneStatus::Ready => {
                self.ambient(dt as f32, out);
                Ok(None)
            }
            SceneStatus::Disabled | SceneStatus::TornDown => Ok(None),
        }
    }

    /// Opacity and scale of the whole scene, from the container's timeline.
    pub fn set_presentation(&mut self, opacity: f64, scale: f64, out: &mut Vec<RenderCommand>) {
        if opacity.is_finite() {
            self.presentation.0 = opacity.clamp(0.0, 1.0) as f32;
        }
        if scale.is_finite() {
            self.presentation.1 = scale.max(0.0) as f32;
        }
        self.flush_presentation(out);
    }

    /// Release the scene. Only a built scene emits `DestroyScene`, and only
    /// once.
    pub fn teardown(&mut self, out: &mut Vec<RenderCommand>) -> bool {
        let built = self.status == SceneStatus::Ready;
        if built {
            out.push(RenderCommand::DestroyScene);
        }
        if self.status != SceneStatus::TornDown {
            tracing::debug!(built, "scene torn down");
        }
        self.status = SceneStatus::TornDown;
        built
    }

    fn build(&mut self, out: &mut Vec<RenderCommand>) -> Result<(), SceneError> {
        let p = &self.params;
        for (field, value) in [
            ("field_of_view", p.field_of_view),
            ("camera_distance", p.camera_distance),
            ("near", p.near),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SceneError::Params {
                    field,
                    value: f64::from(value),
                });
            }
        }

        let field = particle_field(p.particle_count, p.field_spread, self.tuning.seed);
        out.push(RenderCommand::ConfigureScene { params: *p });
        out.push(RenderCommand::CreateParticleField {
            positions: field.positions,
            colors: field.colors,
            size: p.particle_size,
        });
        if self.spec.cards > 0 {
            out.push(RenderCommand::CreateCards {
                cards: card_layout(self.spec.cards, self.tuning.card_radius),
            });
        }
        self.status = SceneStatus::Ready;
        self.flush_presentation(out);
        tracing::debug!(
            particles = self.params.particle_count,
            cards = self.spec.cards,
            "scene built"
        );
        Ok(())
    }

    fn ambient(&mut self, dt: f32, out: &mut Vec<RenderCommand>) {
        let [spin_x, spin_y] = self.tuning.spin;
        self.elapsed += dt;
        self.rotation += glam::Vec3::new(spin_x, spin_y, 0.0) * dt;
        out.push(RenderCommand::SetFieldRotation {
            rotation: self.rotation(),
        });
        for index in 0..self.spec.cards as u32 {
            let (offset, rotation) = card_float(self.elapsed, index, self.spec.cards, &self.tuning);
            out.push(RenderCommand::SetCardTransform {
                index,
                offset,
                rotation,
            });
        }
    }

    fn flush_presentation(&mut self, out: &mut Vec<RenderCommand>) {
        if self.status != SceneStatus::Ready || self.shown == Some(self.presentation) {
            return;
        }
        let (opacity, scale) = self.presentation;
        out.push(RenderCommand::SetSceneTransform { opacity, scale });
        self.shown = Some(self.presentation);
    }
}
