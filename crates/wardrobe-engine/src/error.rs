use thiserror::Error;
use wardrobe_contracts::wizard::WizardError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure of a single retrieval attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("request to {url} failed")]
    Network {
        url: String,
        #[source]
        source: BoxError,
    },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            Self::Status { url, .. } | Self::Network { url, .. } => url,
        }
    }
}

#[derive(Debug, Error)]
pub enum WardrobeError {
    #[error("could not inline {reference}: every retrieval strategy failed")]
    Retrieval {
        reference: String,
        #[source]
        last: FetchError,
    },
    #[error("{operation}: the service returned no image")]
    Generation { operation: &'static str },
    #[error("generation service call failed: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
    #[error("no API key configured; set GEMINI_API_KEY, GOOGLE_API_KEY or API_KEY")]
    MissingApiKey,
    #[error(transparent)]
    Wizard(#[from] WizardError),
}

impl WardrobeError {
    pub(crate) fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn transport_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Retrieval { .. } => "retrieval",
            Self::Generation { .. } => "generation",
            Self::Transport { .. } => "transport",
            Self::MissingApiKey => "configuration",
            Self::Wizard(_) => "wizard",
        }
    }
}

pub type Result<T> = std::result::Result<T, WardrobeError>;

/// Flattens an error and its sources into one line, skipping repeats.
pub fn error_chain_text(err: &(dyn std::error::Error + 'static), max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut current = Some(err);
    while let Some(cause) = current {
        let text = cause.to_string();
        let trimmed = text.trim();
        if !trimmed.is_empty() && parts.last().map(String::as_str) != Some(trimmed) {
            parts.push(trimmed.to_string());
        }
        current = cause.source();
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
