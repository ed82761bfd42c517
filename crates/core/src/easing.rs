use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown easing: {0}")]
pub struct UnknownEasing(pub String);

/// Monotonic easing curves mapping `[0, 1]` onto `[0, 1]`.
///
/// Every curve satisfies `apply(0) == 0`, `apply(1) == 1` and never
/// decreases in between, which the scroll emulator relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    /// Cubic ease-out.
    Power2Out,
    /// Quartic ease-out.
    Power3Out,
    /// Exponential ease-out, the usual smooth-scroll curve.
    ExpoOut,
}

impl Easing {
    pub fn apply(self, t: f64) -> f64 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Self::Linear => t,
            Self::EaseIn => t * t,
            Self::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Self::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Self::Power2Out => 1.0 - (1.0 - t).powi(3),
            Self::Power3Out => 1.0 - (1.0 - t).powi(4),
            Self::ExpoOut => {
                if t >= 1.0 {
                    1.0
                } else {
                    1.0 - 2f64.powf(-10.0 * t)
                }
            }
        }
    }
}

impl FromStr for Easing {
    type Err = UnknownEasing;

    /// Accepts the kebab-case names as well as the dotted and camel-case
    /// spellings animation libraries use (`"power2.out"`, `"easeInOut"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "linear" | "none" => Ok(Self::Linear),
            "easein" | "power1in" => Ok(Self::EaseIn),
            "easeout" | "power1out" => Ok(Self::EaseOut),
            "easeinout" | "power1inout" => Ok(Self::EaseInOut),
            "power2out" | "cubicout" => Ok(Self::Power2Out),
            "power3out" | "quartout" => Ok(Self::Power3Out),
            "expoout" => Ok(Self::ExpoOut),
            _ => Err(UnknownEasing(s.to_string())),
        }
    }
}
