use std::env;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_CORS_PROXY: &str = "https://corsproxy.io/?";
pub const DEFAULT_IMAGE_PROXY: &str = "https://wsrv.nl/";
pub const DEFAULT_PROXY_FORMAT: &str = "png";

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub image_model: String,
    pub cors_proxy: String,
    pub image_proxy: String,
    pub proxy_format: String,
    pub fetch_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            cors_proxy: DEFAULT_CORS_PROXY.to_string(),
            image_proxy: DEFAULT_IMAGE_PROXY.to_string(),
            proxy_format: DEFAULT_PROXY_FORMAT.to_string(),
            fetch_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(90),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        Self {
            api_base: non_empty("GEMINI_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            api_key: non_empty("GEMINI_API_KEY")
                .or_else(|| non_empty("GOOGLE_API_KEY"))
                .or_else(|| non_empty("API_KEY")),
            image_model: non_empty("WARDROBE_IMAGE_MODEL").unwrap_or(defaults.image_model),
            cors_proxy: non_empty("WARDROBE_CORS_PROXY").unwrap_or(defaults.cors_proxy),
            image_proxy: non_empty("WARDROBE_IMAGE_PROXY").unwrap_or(defaults.image_proxy),
            proxy_format: non_empty("WARDROBE_PROXY_FORMAT")
                .map(|value| value.to_ascii_lowercase())
                .unwrap_or(defaults.proxy_format),
            fetch_timeout: seconds_setting(
                non_empty("WARDROBE_FETCH_TIMEOUT_S").as_deref(),
                30.0,
                5.0,
                120.0,
            ),
            request_timeout: seconds_setting(
                non_empty("WARDROBE_REQUEST_TIMEOUT_S").as_deref(),
                90.0,
                15.0,
                300.0,
            ),
        }
    }
}

fn seconds_setting(raw: Option<&str>, default: f64, min: f64, max: f64) -> Duration {
    let value = raw
        .and_then(|text| text.parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(default)
        .clamp(min, max);
    Duration::from_secs_f64(value)
}
