use folio_protocol::{DeviceProfile, DeviceTier};
use serde::{Deserialize, Serialize};

use crate::config::DeviceConfig;

/// What the host knows about the browser at mount time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub user_agent: String,
    pub screen_width: f64,
    pub screen_height: f64,
}

impl Environment {
    pub fn new(user_agent: impl Into<String>, screen_width: f64, screen_height: f64) -> Self {
        Self {
            user_agent: user_agent.into(),
            screen_width,
            screen_height,
        }
    }

    pub fn classify(&self, config: &DeviceConfig) -> DeviceProfile {
        classify_with(
            config,
            &self.user_agent,
            self.screen_width,
            self.screen_height,
        )
    }
}

/// Classify the runtime environment with the default thresholds.
pub fn classify(user_agent: &str, screen_width: f64, screen_height: f64) -> DeviceProfile {
    classify_with(
        &DeviceConfig::default(),
        user_agent,
        screen_width,
        screen_height,
    )
}

/// Classify the runtime environment.
///
/// Touch-class user agents are mobile; a touch device whose smaller screen
/// side fits `narrow_max_width` is narrow mobile; everything else is
/// desktop. Unusable screen dimensions fall back to the lowest tier.
pub fn classify_with(
    config: &DeviceConfig,
    user_agent: &str,
    screen_width: f64,
    screen_height: f64,
) -> DeviceProfile {
    let tier = if !valid_dimension(screen_width) || !valid_dimension(screen_height) {
        tracing::warn!(
            screen_width,
            screen_height,
            "unusable screen size, falling back to the lowest device tier"
        );
        DeviceTier::NarrowMobile
    } else if is_touch_agent(config, user_agent) {
        if screen_width.min(screen_height) <= config.narrow_max_width {
            DeviceTier::NarrowMobile
        } else {
            DeviceTier::Mobile
        }
    } else {
        DeviceTier::Desktop
    };

    let profile = DeviceProfile {
        tier,
        device_pixel_ratio_cap: config.dpr_cap.get(tier),
    };
    tracing::debug!(%tier, "classified device");
    profile
}

fn valid_dimension(px: f64) -> bool {
    px.is_finite() && px > 0.0
}

fn is_touch_agent(config: &DeviceConfig, user_agent: &str) -> bool {
    let ua = user_agent.to_ascii_lowercase();
    config
        .touch_agents
        .iter()
        .any(|fragment| ua.contains(&fragment.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 Mobile/15E148";
    const PIXEL_TABLET: &str = "Mozilla/5.0 (Linux; Android 14; Pixel Tablet) AppleWebKit/537.36";
    const FIREFOX: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:131.0) Gecko/20100101 Firefox/131.0";

    #[test]
    fn desktop_browser() {
        let p = classify(FIREFOX, 1920.0, 1080.0);
        assert_eq!(p.tier, DeviceTier::Desktop);
        assert_eq!(p.device_pixel_ratio_cap, 2.0);
    }

    #[test]
    fn narrow_phone() {
        assert_eq!(classify(IPHONE, 390.0, 844.0).tier, DeviceTier::NarrowMobile);
        // Orientation does not matter.
        assert_eq!(classify(IPHONE, 844.0, 390.0).tier, DeviceTier::NarrowMobile);
    }

    #[test]
    fn wide_touch_device_is_mobile() {
        assert_eq!(classify(PIXEL_TABLET, 1600.0, 2560.0).tier, DeviceTier::Mobile);
        assert_eq!(classify(IPHONE, 430.0, 932.0).tier, DeviceTier::Mobile);
    }

    #[test]
    fn narrow_desktop_window_stays_desktop() {
        assert_eq!(classify(FIREFOX, 380.0, 700.0).tier, DeviceTier::Desktop);
    }

    #[test]
    fn bad_dimensions_degrade_to_lowest_tier() {
        assert_eq!(classify(FIREFOX, 0.0, 1080.0).tier, DeviceTier::NarrowMobile);
        assert_eq!(classify(FIREFOX, f64::NAN, 1080.0).tier, DeviceTier::NarrowMobile);
    }

    #[test]
    fn deterministic() {
        assert_eq!(classify(IPHONE, 390.0, 844.0), classify(IPHONE, 390.0, 844.0));
    }

    #[test]
    fn custom_threshold() {
        let config = DeviceConfig {
            narrow_max_width: 430.0,
            ..DeviceConfig::default()
        };
        let env = Environment::new(IPHONE, 430.0, 932.0);
        assert_eq!(env.classify(&config).tier, DeviceTier::NarrowMobile);
    }
}
