//! Device and environment snapshots
//!
//! A [`DeviceInfo`] is captured exactly once per view session and carried
//! unchanged on every report for that session. Classification works on the
//! raw user-agent string plus screen geometry supplied by the host; there
//! is no platform probing here, which keeps the module usable from any
//! embedding (browser bridge, webview, test harness).

use serde::{Deserialize, Serialize};

/// Coarse device class derived from the user agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Mobile,
    Tablet,
    Desktop,
}

/// Raw environment readings the host samples once at session start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    /// Full user-agent string
    pub user_agent: String,
    /// Physical screen width in pixels
    pub screen_width: u32,
    /// Physical screen height in pixels
    pub screen_height: u32,
    /// Visible viewport width in pixels
    pub viewport_width: u32,
    /// Visible viewport height in pixels
    pub viewport_height: u32,
    /// Device pixel ratio
    pub pixel_ratio: f64,
}

/// Immutable per-session device description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    /// Full user-agent string
    pub user_agent: String,
    /// Screen dimensions as "WxH"
    pub screen_size: String,
    /// Viewport dimensions as "WxH"
    pub viewport_size: String,
    /// Device pixel ratio
    pub pixel_ratio: f64,
    /// Coarse device class
    pub device_type: DeviceClass,
    /// Browser family name
    pub browser_name: String,
    /// Operating system name
    pub os: String,
}

impl DeviceInfo {
    /// Build a device description from a raw environment snapshot
    pub fn from_snapshot(snapshot: &EnvironmentSnapshot) -> Self {
        Self {
            user_agent: snapshot.user_agent.clone(),
            screen_size: format!("{}x{}", snapshot.screen_width, snapshot.screen_height),
            viewport_size: format!("{}x{}", snapshot.viewport_width, snapshot.viewport_height),
            pixel_ratio: snapshot.pixel_ratio,
            device_type: classify_device(&snapshot.user_agent),
            browser_name: classify_browser(&snapshot.user_agent).to_string(),
            os: classify_os(&snapshot.user_agent).to_string(),
        }
    }

    /// Placeholder description for environments that supply nothing
    pub fn unknown() -> Self {
        Self {
            user_agent: String::new(),
            screen_size: "0x0".to_string(),
            viewport_size: "0x0".to_string(),
            pixel_ratio: 1.0,
            device_type: DeviceClass::Desktop,
            browser_name: "Unknown".to_string(),
            os: "Unknown".to_string(),
        }
    }
}

/// One-shot environment snapshot source, injected into the tracker
pub trait DeviceInfoSource: Send {
    /// Capture the current environment description
    fn collect(&self) -> DeviceInfo;
}

/// Source that hands out a pre-captured description.
///
/// Hosts that sample the environment once at page load wrap the result in
/// this; tests use it to pin a known device.
#[derive(Debug, Clone)]
pub struct StaticDeviceSource(pub DeviceInfo);

impl DeviceInfoSource for StaticDeviceSource {
    fn collect(&self) -> DeviceInfo {
        self.0.clone()
    }
}

/// User-agent tokens that mark a handheld device
const MOBILE_TOKENS: &[&str] = &[
    "android", "webos", "iphone", "ipad", "ipod", "blackberry", "iemobile", "opera mini",
];

/// User-agent tokens that mark a tablet
const TABLET_TOKENS: &[&str] = &["ipad", "tablet"];

/// Classify the browser family.
///
/// Token order matters: Chrome ships "Safari" in its user agent, so Chrome
/// is tested first, matching the upstream detection order.
pub fn classify_browser(user_agent: &str) -> &'static str {
    if user_agent.contains("Chrome") {
        "Chrome"
    } else if user_agent.contains("Safari") {
        "Safari"
    } else if user_agent.contains("Firefox") {
        "Firefox"
    } else if user_agent.contains("MSIE") || user_agent.contains("Trident") {
        "Internet Explorer"
    } else if user_agent.contains("Edge") {
        "Edge"
    } else if user_agent.contains("Opera") {
        "Opera"
    } else {
        "Unknown"
    }
}

/// Classify the operating system
pub fn classify_os(user_agent: &str) -> &'static str {
    if user_agent.contains("Windows") {
        "Windows"
    } else if user_agent.contains("Mac") {
        "MacOS"
    } else if user_agent.contains("Android") {
        "Android"
    } else if user_agent.contains("iOS") || user_agent.contains("iPhone") || user_agent.contains("iPad") {
        "iOS"
    } else if user_agent.contains("Linux") {
        "Linux"
    } else {
        "Unknown"
    }
}

/// Classify the device class.
///
/// Handheld tokens win over tablet tokens, so an iPad reports as mobile;
/// this reproduces the upstream producer and keeps historical data
/// comparable.
pub fn classify_device(user_agent: &str) -> DeviceClass {
    let lowered = user_agent.to_lowercase();
    if MOBILE_TOKENS.iter().any(|t| lowered.contains(t)) {
        DeviceClass::Mobile
    } else if TABLET_TOKENS.iter().any(|t| lowered.contains(t)) {
        DeviceClass::Tablet
    } else {
        DeviceClass::Desktop
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CHROME_DESKTOP: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const SAFARI_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 \
         (KHTML, like Gecko) Version/17.0 Safari/605.1.15";
    const FIREFOX_LINUX: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";
    const ANDROID_PHONE: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";

    #[test]
    fn test_browser_classification() {
        assert_eq!(classify_browser(CHROME_DESKTOP), "Chrome");
        assert_eq!(classify_browser(SAFARI_MAC), "Safari");
        assert_eq!(classify_browser(FIREFOX_LINUX), "Firefox");
        assert_eq!(classify_browser("Mozilla/4.0 (compatible; MSIE 8.0)"), "Internet Explorer");
        assert_eq!(classify_browser(""), "Unknown");
    }

    #[test]
    fn test_chrome_wins_over_safari_token() {
        // Chrome user agents carry both tokens
        assert!(CHROME_DESKTOP.contains("Safari"));
        assert_eq!(classify_browser(CHROME_DESKTOP), "Chrome");
    }

    #[test]
    fn test_os_classification() {
        assert_eq!(classify_os(CHROME_DESKTOP), "Windows");
        assert_eq!(classify_os(SAFARI_MAC), "MacOS");
        assert_eq!(classify_os(FIREFOX_LINUX), "Linux");
        assert_eq!(classify_os(ANDROID_PHONE), "Android");
        assert_eq!(classify_os("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)"), "MacOS");
        assert_eq!(classify_os("unrecognized"), "Unknown");
    }

    #[test]
    fn test_device_classification() {
        assert_eq!(classify_device(CHROME_DESKTOP), DeviceClass::Desktop);
        assert_eq!(classify_device(ANDROID_PHONE), DeviceClass::Mobile);
        assert_eq!(
            classify_device("Mozilla/5.0 (Tablet; rv:121.0) Gecko/121.0 Firefox/121.0"),
            DeviceClass::Tablet
        );
        // Handheld tokens win over tablet tokens
        assert_eq!(
            classify_device("Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X)"),
            DeviceClass::Mobile
        );
    }

    #[test]
    fn test_from_snapshot_formats_dimensions() {
        let snapshot = EnvironmentSnapshot {
            user_agent: CHROME_DESKTOP.to_string(),
            screen_width: 1920,
            screen_height: 1080,
            viewport_width: 1600,
            viewport_height: 900,
            pixel_ratio: 2.0,
        };

        let info = DeviceInfo::from_snapshot(&snapshot);
        assert_eq!(info.screen_size, "1920x1080");
        assert_eq!(info.viewport_size, "1600x900");
        assert_eq!(info.pixel_ratio, 2.0);
        assert_eq!(info.device_type, DeviceClass::Desktop);
        assert_eq!(info.browser_name, "Chrome");
        assert_eq!(info.os, "Windows");
    }

    #[test]
    fn test_wire_field_names() {
        let info = DeviceInfo::from_snapshot(&EnvironmentSnapshot {
            user_agent: ANDROID_PHONE.to_string(),
            screen_width: 412,
            screen_height: 915,
            viewport_width: 412,
            viewport_height: 780,
            pixel_ratio: 2.6,
        });

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["userAgent"], ANDROID_PHONE);
        assert_eq!(json["screenSize"], "412x915");
        assert_eq!(json["viewportSize"], "412x780");
        assert_eq!(json["pixelRatio"], 2.6);
        assert_eq!(json["deviceType"], "mobile");
        assert_eq!(json["browserName"], "Chrome");
        assert_eq!(json["os"], "Android");
    }
}
