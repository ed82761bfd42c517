use folio_protocol::{DeviceProfile, PostProcessing, SceneParams};

use crate::config::{EffectsLevel, SceneTuning};

/// Renderer parameters for a device. `device_pixel_ratio` is the screen's
/// actual ratio; it is capped by the profile.
pub fn scene_params(
    profile: &DeviceProfile,
    tuning: &SceneTuning,
    device_pixel_ratio: f64,
) -> SceneParams {
    let tier = profile.tier;
    let post_processing = match tuning.effects.get(tier) {
        EffectsLevel::Full => PostProcessing::Full {
            bloom_threshold: tuning.bloom_threshold,
            bloom_intensity: tuning.bloom_intensity,
            noise_opacity: tuning.noise_opacity,
        },
        EffectsLevel::Reduced => PostProcessing::Reduced {
            bloom_threshold: tuning.bloom_threshold,
            bloom_intensity: tuning.bloom_intensity,
        },
        EffectsLevel::Disabled => PostProcessing::Disabled,
    };
    let dpr = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
        device_pixel_ratio
    } else {
        1.0
    };

    SceneParams {
        particle_count: tuning.particle_count.get(tier),
        particle_size: tuning.particle_size.get(tier),
        field_spread: tuning.field_spread,
        camera_distance: tuning.camera_distance.get(tier),
        field_of_view: tuning.field_of_view,
        near: tuning.near,
        far: tuning.far,
        post_processing,
        antialias: tuning.antialias.get(tier),
        device_pixel_ratio: dpr.min(profile.device_pixel_ratio_cap),
    }
}
