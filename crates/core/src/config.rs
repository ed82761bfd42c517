//! Mount-time tuning for every component.
//!
//! All policy constants live here: tier thresholds, per-tier particle
//! counts, step detail, stagger, scroll feel. The defaults reproduce the
//! portfolio site; a host can override any part of it with JSON.

use folio_protocol::DeviceTier;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::easing::Easing;
use crate::timeline::Detail;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{metric}: {lower} tier exceeds {upper} tier")]
    TierOrder {
        metric: &'static str,
        upper: DeviceTier,
        lower: DeviceTier,
    },
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// One value per device tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierTable<T> {
    pub desktop: T,
    pub mobile: T,
    pub narrow_mobile: T,
}

impl<T: Copy> TierTable<T> {
    pub const fn new(desktop: T, mobile: T, narrow_mobile: T) -> Self {
        Self {
            desktop,
            mobile,
            narrow_mobile,
        }
    }

    pub fn get(&self, tier: DeviceTier) -> T {
        match tier {
            DeviceTier::Desktop => self.desktop,
            DeviceTier::Mobile => self.mobile,
            DeviceTier::NarrowMobile => self.narrow_mobile,
        }
    }

    /// Check that a capability metric never grows as the tier drops.
    fn check_downgrade<K: PartialOrd>(
        &self,
        metric: &'static str,
        key: impl Fn(T) -> K,
    ) -> Result<(), ConfigError> {
        for upper in DeviceTier::ALL {
            let Some(lower) = upper.downgrade() else {
                continue;
            };
            if key(self.get(lower)) > key(self.get(upper)) {
                return Err(ConfigError::TierOrder {
                    metric,
                    upper,
                    lower,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Case-insensitive user-agent fragments that mark a touch device.
    pub touch_agents: Vec<String>,
    /// A touch device whose smaller screen side is at most this wide is
    /// classified as narrow.
    pub narrow_max_width: f64,
    pub dpr_cap: TierTable<f64>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            touch_agents: ["iphone", "ipad", "ipod", "android", "mobi"]
                .into_iter()
                .map(String::from)
                .collect(),
            narrow_max_width: 390.0,
            dpr_cap: TierTable::new(2.0, 2.0, 1.5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollTuning {
    /// Seconds for the virtual offset to settle after the last input.
    pub duration: f64,
    pub easing: Easing,
    pub smooth_wheel: bool,
    pub smooth_touch: bool,
    pub touch_multiplier: f64,
    pub wheel_multiplier: f64,
}

impl ScrollTuning {
    pub const DESKTOP: ScrollTuning = ScrollTuning {
        duration: 1.2,
        easing: Easing::ExpoOut,
        smooth_wheel: true,
        smooth_touch: false,
        touch_multiplier: 2.0,
        wheel_multiplier: 1.0,
    };

    pub const MOBILE: ScrollTuning = ScrollTuning {
        duration: 0.8,
        easing: Easing::ExpoOut,
        smooth_wheel: true,
        smooth_touch: false,
        touch_multiplier: 1.5,
        wheel_multiplier: 1.0,
    };
}

/// Post-processing budget per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EffectsLevel {
    Full,
    Reduced,
    Disabled,
}

impl EffectsLevel {
    pub fn passes(self) -> u32 {
        match self {
            Self::Full => 3,
            Self::Reduced => 1,
            Self::Disabled => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneTuning {
    pub particle_count: TierTable<u32>,
    pub particle_size: TierTable<f32>,
    pub camera_distance: TierTable<f32>,
    pub effects: TierTable<EffectsLevel>,
    pub antialias: TierTable<bool>,
    pub field_spread: f32,
    pub field_of_view: f32,
    pub near: f32,
    pub far: f32,
    pub bloom_threshold: f32,
    pub bloom_intensity: f32,
    pub noise_opacity: f32,
    /// Radians per second around the x and y axes.
    pub spin: [f32; 2],
    pub card_radius: f32,
    pub float_speed: f32,
    pub float_intensity: f32,
    pub rotation_intensity: f32,
    /// Seed for the particle layout so every visit sees the same field.
    pub seed: u64,
}

impl Default for SceneTuning {
    fn default() -> Self {
        Self {
            particle_count: TierTable::new(3000, 1500, 800),
            particle_size: TierTable::new(0.15, 0.1, 0.08),
            camera_distance: TierTable::new(25.0, 30.0, 32.0),
            effects: TierTable::new(
                EffectsLevel::Full,
                EffectsLevel::Reduced,
                EffectsLevel::Disabled,
            ),
            antialias: TierTable::new(true, false, false),
            field_spread: 50.0,
            field_of_view: 75.0,
            near: 0.1,
            far: 1000.0,
            bloom_threshold: 0.5,
            bloom_intensity: 1.5,
            noise_opacity: 0.05,
            spin: [0.02, 0.05],
            card_radius: 5.0,
            float_speed: 2.0,
            float_intensity: 0.5,
            rotation_intensity: 0.2,
            seed: 0x5EED_F011,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionTuning {
    /// Most detailed timeline step each tier still plays.
    pub detail: TierTable<Detail>,
    /// Multiplier on every stagger delay.
    pub stagger_factor: TierTable<f64>,
    /// Delay between consecutive gallery cards revealing, before scaling.
    pub reveal_stagger: f64,
    pub reveal_duration: f64,
    /// Distance the cards rise while revealing, in CSS pixels.
    pub reveal_offset: f64,
    /// Visible fraction that counts as "in view".
    pub reveal_amount: f64,
}

impl Default for MotionTuning {
    fn default() -> Self {
        Self {
            detail: TierTable::new(Detail::Full, Detail::Enhanced, Detail::Essential),
            stagger_factor: TierTable::new(1.0, 0.5, 0.25),
            reveal_stagger: 0.2,
            reveal_duration: 0.5,
            reveal_offset: 50.0,
            reveal_amount: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub device: DeviceConfig,
    pub scroll: TierTable<ScrollTuning>,
    pub scene: SceneTuning,
    pub motion: MotionTuning,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            scroll: TierTable::new(
                ScrollTuning::DESKTOP,
                ScrollTuning::MOBILE,
                ScrollTuning::MOBILE,
            ),
            scene: SceneTuning::default(),
            motion: MotionTuning::default(),
        }
    }
}

impl MotionConfig {
    /// Parse a (possibly partial) JSON override and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: MotionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject tables where a weaker tier would get more work than a stronger
    /// one, and values no component can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scene = &self.scene;
        scene.particle_count.check_downgrade("particle_count", |n| n)?;
        scene
            .effects
            .check_downgrade("post-processing passes", EffectsLevel::passes)?;
        scene
            .particle_size
            .check_downgrade("particle_size", |s| s)?;
        self.motion.detail.check_downgrade("timeline detail", |d| d)?;
        self.motion
            .stagger_factor
            .check_downgrade("stagger_factor", |s| s)?;
        self.device.dpr_cap.check_downgrade("dpr_cap", |d| d)?;

        for tier in DeviceTier::ALL {
            let scroll = self.scroll.get(tier);
            positive("scroll.duration", scroll.duration)?;
            positive("scroll.touch_multiplier", scroll.touch_multiplier)?;
            positive("scroll.wheel_multiplier", scroll.wheel_multiplier)?;
            positive("device.dpr_cap", self.device.dpr_cap.get(tier))?;
            positive(
                "scene.camera_distance",
                f64::from(scene.camera_distance.get(tier)),
            )?;
        }
        positive("device.narrow_max_width", self.device.narrow_max_width)?;
        positive("motion.reveal_duration", self.motion.reveal_duration)?;
        if !(0.0..=1.0).contains(&self.motion.reveal_amount) {
            return Err(ConfigError::OutOfRange {
                field: "motion.reveal_amount",
                value: self.motion.reveal_amount,
            });
        }
        positive("scene.near", f64::from(scene.near))?;
        if !(scene.field_of_view > 0.0 && scene.field_of_view < 180.0) {
            return Err(ConfigError::OutOfRange {
                field: "scene.field_of_view",
                value: f64::from(scene.field_of_view),
            });
        }
        if !scene.far.is_finite() || scene.far <= scene.near {
            return Err(ConfigError::OutOfRange {
                field: "scene.far",
                value: f64::from(scene.far),
            });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(MotionConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config = MotionConfig::from_json(r#"{"device":{"narrow_max_width":414}}"#).unwrap();
        assert_eq!(config.device.narrow_max_width, 414.0);
        assert_eq!(config.scene.particle_count.desktop, 3000);
        assert_eq!(config.device.touch_agents.len(), 5);
    }

    #[test]
    fn rejects_mobile_heavier_than_desktop() {
        let json = r#"{"scene":{"particle_count":{"desktop":1000,"mobile":2000,"narrow_mobile":500}}}"#;
        match MotionConfig::from_json(json) {
            Err(ConfigError::TierOrder { metric, lower, .. }) => {
                assert_eq!(metric, "particle_count");
                assert_eq!(lower, DeviceTier::Mobile);
            }
            other => panic!("expected tier order error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_zero_duration() {
        let mut config = MotionConfig::default();
        config.scroll.mobile.duration = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "scroll.duration",
                ..
            })
        ));
    }

    #[test]
    fn rejects_degenerate_camera() {
        let field = |config: MotionConfig| match config.validate() {
            Err(ConfigError::OutOfRange { field, .. }) => field,
            other => panic!("expected out of range, got {other:?}"),
        };

        let mut config = MotionConfig::default();
        config.scene.field_of_view = 0.0;
        assert_eq!(field(config), "scene.field_of_view");

        let mut config = MotionConfig::default();
        config.scene.camera_distance.narrow_mobile = -1.0;
        assert_eq!(field(config), "scene.camera_distance");

        let mut config = MotionConfig::default();
        config.scene.near = 0.0;
        assert_eq!(field(config), "scene.near");
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            MotionConfig::from_json("{"),
            Err(ConfigError::Json(_))
        ));
    }
}
