//! User-agent fingerprint derivation.
//!
//! Classification is ordered substring matching: tablet patterns win over
//! mobile patterns, and the first matching browser/OS pattern wins. Anything
//! unmatched is "Unknown". This is a coarse fingerprint for recognizing
//! repeat logins, not precise device identification.

/// Coarse device class derived from the user agent and screen width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceType {
    Tablet,
    Mobile,
    Desktop,
}

impl DeviceType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tablet => "tablet",
            Self::Mobile => "mobile",
            Self::Desktop => "desktop",
        }
    }
}

const TABLET_PATTERNS: &[&str] = &["tablet", "ipad", "playbook", "silk"];
const MOBILE_PATTERNS: &[&str] = &[
    "mobile",
    "android",
    "iphone",
    "ipod",
    "iemobile",
    "blackberry",
    "kindle",
    "silk-accelerated",
    "hpwos",
    "webos",
    "opera mobi",
    "opera mini",
];

/// Classify the device: tablet patterns first, then mobile, else desktop.
/// An Android user agent without "mobi" is a tablet. A narrow screen alone
/// does not reclassify a desktop agent; width only breaks the tie for
/// agents that carry no recognizable pattern.
#[must_use]
pub fn classify_device_type(user_agent: &str, screen_width: Option<u32>) -> DeviceType {
    let ua = user_agent.to_lowercase();

    if TABLET_PATTERNS.iter().any(|pattern| ua.contains(pattern))
        || (ua.contains("android") && !ua.contains("mobi"))
    {
        return DeviceType::Tablet;
    }

    if MOBILE_PATTERNS.iter().any(|pattern| ua.contains(pattern)) {
        return DeviceType::Mobile;
    }

    match screen_width {
        Some(width) if width < 768 => DeviceType::Mobile,
        _ => DeviceType::Desktop,
    }
}

/// First matching browser pattern wins; Edge and Opera carry Chrome tokens
/// so their checks exclude each other explicitly.
#[must_use]
pub fn classify_browser(user_agent: &str) -> &'static str {
    if user_agent.contains("Firefox") {
        "Firefox"
    } else if user_agent.contains("Edg") {
        "Edge"
    } else if user_agent.contains("Opera") || user_agent.contains("OPR") {
        "Opera"
    } else if user_agent.contains("Chrome") {
        "Chrome"
    } else if user_agent.contains("Safari") {
        "Safari"
    } else {
        "Unknown"
    }
}

#[must_use]
pub fn classify_os(user_agent: &str) -> &'static str {
    if user_agent.contains("iOS") || user_agent.contains("iPhone") || user_agent.contains("iPad") {
        "iOS"
    } else if user_agent.contains("Android") {
        "Android"
    } else if user_agent.contains("Win") {
        "Windows"
    } else if user_agent.contains("Mac") {
        "MacOS"
    } else if user_agent.contains("Linux") {
        "Linux"
    } else {
        "Unknown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_DESKTOP: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
         AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
    const ANDROID_TABLET: &str =
        "Mozilla/5.0 (Linux; Android 13; SM-X710) AppleWebKit/537.36 Chrome/120.0.0.0 Safari/537.36";
    const ANDROID_PHONE: &str = "Mozilla/5.0 (Linux; Android 13; Pixel 7) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";
    const EDGE_DESKTOP: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0";

    #[test]
    fn desktop_chrome_is_desktop() {
        assert_eq!(
            classify_device_type(CHROME_DESKTOP, Some(1920)),
            DeviceType::Desktop
        );
    }

    #[test]
    fn iphone_is_mobile() {
        assert_eq!(
            classify_device_type(SAFARI_IPHONE, Some(390)),
            DeviceType::Mobile
        );
    }

    #[test]
    fn ipad_is_tablet() {
        let ua = "Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X) AppleWebKit/605.1.15";
        assert_eq!(classify_device_type(ua, Some(1024)), DeviceType::Tablet);
    }

    #[test]
    fn android_without_mobile_token_is_tablet() {
        assert_eq!(
            classify_device_type(ANDROID_TABLET, Some(1280)),
            DeviceType::Tablet
        );
    }

    #[test]
    fn android_with_mobile_token_is_mobile() {
        assert_eq!(
            classify_device_type(ANDROID_PHONE, Some(412)),
            DeviceType::Mobile
        );
    }

    #[test]
    fn unmatched_agent_uses_screen_width() {
        assert_eq!(classify_device_type("curl/8.0", Some(500)), DeviceType::Mobile);
        assert_eq!(classify_device_type("curl/8.0", Some(1440)), DeviceType::Desktop);
        assert_eq!(classify_device_type("curl/8.0", None), DeviceType::Desktop);
    }

    #[test]
    fn browser_order_handles_chrome_tokens() {
        assert_eq!(classify_browser(CHROME_DESKTOP), "Chrome");
        assert_eq!(classify_browser(EDGE_DESKTOP), "Edge");
        assert_eq!(classify_browser(SAFARI_IPHONE), "Safari");
        assert_eq!(
            classify_browser("Mozilla/5.0 (X11; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0"),
            "Firefox"
        );
        assert_eq!(classify_browser("curl/8.0"), "Unknown");
    }

    #[test]
    fn os_classification() {
        assert_eq!(classify_os(CHROME_DESKTOP), "Windows");
        assert_eq!(classify_os(SAFARI_IPHONE), "iOS");
        assert_eq!(classify_os(ANDROID_PHONE), "Android");
        assert_eq!(
            classify_os("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)"),
            "MacOS"
        );
        assert_eq!(classify_os("Mozilla/5.0 (X11; Linux x86_64)"), "Linux");
        assert_eq!(classify_os("curl/8.0"), "Unknown");
    }

    #[test]
    fn device_type_strings() {
        assert_eq!(DeviceType::Tablet.as_str(), "tablet");
        assert_eq!(DeviceType::Mobile.as_str(), "mobile");
        assert_eq!(DeviceType::Desktop.as_str(), "desktop");
    }
}
