#![forbid(unsafe_code)]

//! One-shot platform classification.
//!
//! The profile is computed once when the adapter is built and never
//! re-evaluated per event, so reconciliation stays a pure function of
//! `(state, event, profile)`.

use serde::{Deserialize, Serialize};

const IOS_DEVICE_TOKENS: [&str; 3] = ["iPad", "iPhone", "iPod"];

const MOBILE_DEVICE_TOKENS: [&str; 8] = [
    "android",
    "webos",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
];

/// Raw environment signals used for classification.
///
/// Hosts read these from `navigator` (`userAgent`, `platform`,
/// `maxTouchPoints`) or inject them directly in tests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSignals {
    pub user_agent: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub max_touch_points: u32,
}

impl PlatformSignals {
    #[must_use]
    pub fn new(user_agent: impl Into<String>, platform: impl Into<String>, touch: u32) -> Self {
        Self {
            user_agent: user_agent.into(),
            platform: platform.into(),
            max_touch_points: touch,
        }
    }

    /// iPadOS reports itself as a desktop Mac; touch points give it away.
    fn is_touch_mac(&self) -> bool {
        self.platform == "MacIntel" && self.max_touch_points > 1
    }
}

/// Immutable input-policy classification of the current environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformProfile {
    pub touch_primary: bool,
    pub ios_like: bool,
}

impl PlatformProfile {
    pub const DESKTOP: Self = Self {
        touch_primary: false,
        ios_like: false,
    };

    pub const ANDROID: Self = Self {
        touch_primary: true,
        ios_like: false,
    };

    pub const IOS: Self = Self {
        touch_primary: true,
        ios_like: true,
    };

    #[must_use]
    pub fn classify(signals: &PlatformSignals) -> Self {
        let touch_mac = signals.is_touch_mac();
        let ios_like = touch_mac
            || IOS_DEVICE_TOKENS
                .iter()
                .any(|token| signals.user_agent.contains(token));

        let ua_lower = signals.user_agent.to_ascii_lowercase();
        let touch_primary = ios_like
            || MOBILE_DEVICE_TOKENS
                .iter()
                .any(|token| ua_lower.contains(token));

        Self {
            touch_primary,
            ios_like,
        }
    }

    /// Whether the frontend should wire the virtual-keyboard, composition
    /// and touch channels at all.
    #[must_use]
    pub const fn wants_virtual_keyboard_channels(self) -> bool {
        self.touch_primary || self.ios_like
    }
}
