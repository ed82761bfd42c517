use serde::{Deserialize, Serialize};

/// Discrete capability class used to scale animation cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceTier {
    Desktop,
    Mobile,
    /// Touch device with a very narrow screen (around 390 px).
    NarrowMobile,
}

impl DeviceTier {
    /// All tiers from most to least capable.
    pub const ALL: [DeviceTier; 3] = [Self::Desktop, Self::Mobile, Self::NarrowMobile];

    /// Capability rank: higher means more compute budget.
    pub fn rank(self) -> u8 {
        match self {
            Self::Desktop => 2,
            Self::Mobile => 1,
            Self::NarrowMobile => 0,
        }
    }

    pub fn is_touch(self) -> bool {
        !matches!(self, Self::Desktop)
    }

    /// The next tier down, or `None` at the bottom.
    pub fn downgrade(self) -> Option<DeviceTier> {
        match self {
            Self::Desktop => Some(Self::Mobile),
            Self::Mobile => Some(Self::NarrowMobile),
            Self::NarrowMobile => None,
        }
    }
}

impl std::fmt::Display for DeviceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Desktop => write!(f, "desktop"),
            Self::Mobile => write!(f, "mobile"),
            Self::NarrowMobile => write!(f, "narrow-mobile"),
        }
    }
}

/// Result of classifying the runtime environment. Computed once per page
/// and passed by value to every component that scales with it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub tier: DeviceTier,
    /// Upper bound for the 3D surface's device pixel ratio.
    pub device_pixel_ratio_cap: f64,
}

impl DeviceProfile {
    pub fn is_touch(&self) -> bool {
        self.tier.is_touch()
    }
}
