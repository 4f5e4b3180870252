use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::CONTENT_TYPE;
use serde_json::json;
use wardrobe_contracts::events::{emit_best_effort, EventWriter};

use crate::config::EngineConfig;
use crate::data_url::{sniff_mime_type, to_data_url, DEFAULT_MIME_TYPE};
use crate::error::{error_chain_text, FetchError, Result, WardrobeError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

pub trait ImageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> std::result::Result<FetchedImage, FetchError>;
}

/// Plain GET without cookies or auth headers.
pub struct HttpImageFetcher {
    http: HttpClient,
    timeout: Duration,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: HttpClient::new(),
            timeout,
        }
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, url: &str) -> std::result::Result<FetchedImage, FetchError> {
        let network = |err: reqwest::Error| FetchError::Network {
            url: url.to_string(),
            source: Box::new(err),
        };
        let response = self
            .http
            .get(url)
            .timeout(self.timeout)
            .send()
            .map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(|value| value.trim().to_ascii_lowercase())
            .filter(|value| !value.is_empty());
        let bytes = response.bytes().map_err(network)?.to_vec();
        Ok(FetchedImage {
            bytes,
            content_type,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStrategy {
    Direct,
    /// Generic pass-through proxy: `<base><encoded url>`.
    CorsProxy { base: String },
    /// Image proxy that re-encodes to `format`: `<base>?url=<encoded url>&output=<format>`.
    TranscodeProxy { base: String, format: String },
}

impl FetchStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::CorsProxy { .. } => "cors_proxy",
            Self::TranscodeProxy { .. } => "transcode_proxy",
        }
    }

    pub fn target_url(&self, reference: &str) -> String {
        match self {
            Self::Direct => reference.to_string(),
            Self::CorsProxy { base } => format!("{base}{}", encode_component(reference)),
            Self::TranscodeProxy { base, format } => {
                let separator = if base.contains('?') { '&' } else { '?' };
                format!(
                    "{base}{separator}url={}&output={}",
                    encode_component(reference),
                    encode_component(format)
                )
            }
        }
    }

    pub fn forced_mime_type(&self) -> Option<String> {
        match self {
            Self::TranscodeProxy { format, .. } => Some(mime_for_format(format)),
            Self::Direct | Self::CorsProxy { .. } => None,
        }
    }
}

pub fn default_strategies(config: &EngineConfig) -> Vec<FetchStrategy> {
    vec![
        FetchStrategy::Direct,
        FetchStrategy::CorsProxy {
            base: config.cors_proxy.clone(),
        },
        FetchStrategy::TranscodeProxy {
            base: config.image_proxy.clone(),
            format: config.proxy_format.clone(),
        },
    ]
}

pub fn is_remote_reference(reference: &str) -> bool {
    let head: String = reference
        .chars()
        .take(8)
        .collect::<String>()
        .to_ascii_lowercase();
    head.starts_with("http://") || head.starts_with("https://")
}

/// Turns image references into inline `data:` URLs, walking an ordered list
/// of retrieval strategies until one of them answers.
pub struct AssetResolver {
    fetcher: Box<dyn ImageFetcher>,
    strategies: Vec<FetchStrategy>,
    events: Option<EventWriter>,
}

impl AssetResolver {
    pub fn new(fetcher: impl ImageFetcher + 'static, strategies: Vec<FetchStrategy>) -> Self {
        Self {
            fetcher: Box::new(fetcher),
            strategies,
            events: None,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            HttpImageFetcher::new(config.fetch_timeout),
            default_strategies(config),
        )
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn strategies(&self) -> &[FetchStrategy] {
        &self.strategies
    }

    pub fn resolve_to_inline_data(&self, reference: &str) -> Result<String> {
        if !is_remote_reference(reference) {
            return Ok(reference.to_string());
        }

        let mut last_error: Option<FetchError> = None;
        for (idx, strategy) in self.strategies.iter().enumerate() {
            let target = strategy.target_url(reference);
            match self.fetcher.fetch(&target) {
                Ok(image) => {
                    let mime_type = strategy
                        .forced_mime_type()
                        .unwrap_or_else(|| served_mime_type(&image));
                    emit_best_effort(
                        self.events.as_ref(),
                        "asset_resolved",
                        map_object(json!({
                            "reference": reference,
                            "strategy": strategy.label(),
                            "attempt": idx + 1,
                            "mime_type": mime_type,
                            "bytes": image.bytes.len(),
                        })),
                    );
                    return Ok(to_data_url(&mime_type, &image.bytes));
                }
                Err(err) => {
                    if let Some(next) = self.strategies.get(idx + 1) {
                        emit_best_effort(
                            self.events.as_ref(),
                            "asset_fetch_fallback",
                            map_object(json!({
                                "reference": reference,
                                "from": strategy.label(),
                                "to": next.label(),
                                "error": error_chain_text(&err, 512),
                            })),
                        );
                    }
                    last_error = Some(err);
                }
            }
        }

        let last = last_error.unwrap_or_else(|| FetchError::Network {
            url: reference.to_string(),
            source: "no retrieval strategies configured".into(),
        });
        emit_best_effort(
            self.events.as_ref(),
            "asset_fetch_exhausted",
            map_object(json!({
                "reference": reference,
                "attempts": self.strategies.len(),
                "error": error_chain_text(&last, 512),
            })),
        );
        Err(WardrobeError::Retrieval {
            reference: reference.to_string(),
            last,
        })
    }
}

// Served image/* types win, then magic-number sniffing, then whatever was served.
fn served_mime_type(image: &FetchedImage) -> String {
    let served = image.content_type.as_deref();
    if let Some(mime) = served.filter(|mime| mime.starts_with("image/")) {
        return mime.to_string();
    }
    sniff_mime_type(&image.bytes)
        .map(str::to_string)
        .or_else(|| served.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string())
}

fn mime_for_format(format: &str) -> String {
    image::ImageFormat::from_extension(format)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|| format!("image/{}", format.to_ascii_lowercase()))
}

// Everything but `A-Z a-z 0-9 - _ . ! ~ * ' ( )`, the same set a browser's
// `encodeURIComponent` keeps.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

pub(crate) fn map_object(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    value.as_object().cloned().unwrap_or_default()
}
