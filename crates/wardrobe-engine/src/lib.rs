pub mod config;
pub mod data_url;
pub mod error;
pub mod files;
pub mod generation;
pub mod resolver;
pub mod session;

#[cfg(test)]
mod testing;

use wardrobe_contracts::events::EventWriter;

pub use config::EngineConfig;
pub use error::{FetchError, Result, WardrobeError};
pub use generation::{DryrunBackend, GeminiBackend, GenerationBackend, GenerationClient};
pub use resolver::{AssetResolver, FetchStrategy, HttpImageFetcher, ImageFetcher};
pub use session::WizardSession;

/// Wires the HTTP resolver and the chosen backend into a client. Dryrun
/// swaps the Gemini call for a local placeholder renderer.
pub fn build_client(
    config: &EngineConfig,
    dryrun: bool,
    events: Option<EventWriter>,
) -> GenerationClient {
    let mut resolver = AssetResolver::from_config(config);
    if let Some(events) = events {
        resolver = resolver.with_events(events);
    }
    if dryrun {
        GenerationClient::new(DryrunBackend, resolver, "dryrun")
    } else {
        GenerationClient::new(
            GeminiBackend::from_config(config),
            resolver,
            config.image_model.clone(),
        )
    }
}
