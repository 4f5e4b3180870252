use serde_json::{json, Value};
use wardrobe_contracts::assets::{AssetCategory, ImageAsset};
use wardrobe_contracts::events::{emit_best_effort, EventPayload, EventWriter};
use wardrobe_contracts::wizard::{WizardError, WizardState, WizardStep};

use crate::error::{error_chain_text, Result, WardrobeError};
use crate::generation::GenerationClient;
use crate::resolver::map_object;

/// Session-scoped controller: owns the wizard state and is the only thing
/// that mutates it. Failed generations leave the state as it was.
pub struct WizardSession {
    state: WizardState,
    client: GenerationClient,
    designed_cloths: Vec<ImageAsset>,
    events: Option<EventWriter>,
}

impl WizardSession {
    pub fn new(client: GenerationClient, events: Option<EventWriter>) -> Self {
        let session = Self {
            state: WizardState::new(),
            client,
            designed_cloths: Vec::new(),
            events,
        };
        session.emit(
            "session_started",
            map_object(json!({
                "backend": session.client.backend_name(),
                "model": session.client.model(),
            })),
        );
        session
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn client(&self) -> &GenerationClient {
        &self.client
    }

    /// Clothing designed from text in this session, most recent first.
    pub fn designed_cloths(&self) -> &[ImageAsset] {
        &self.designed_cloths
    }

    pub fn select_face(&mut self, asset: ImageAsset) {
        self.emit("face_selected", asset_payload(&asset));
        self.state.select_face(asset);
    }

    pub fn select_cloth(&mut self, asset: ImageAsset) -> Result<()> {
        let payload = asset_payload(&asset);
        self.state.select_cloth(asset)?;
        self.emit("cloth_selected", payload);
        Ok(())
    }

    pub fn navigate_to(&mut self, step: WizardStep) -> bool {
        let from = self.state.current_step();
        let moved = self.state.navigate_to(step);
        if moved && from != step {
            self.emit(
                "step_changed",
                map_object(json!({ "from": from.number(), "to": step.number() })),
            );
        }
        moved
    }

    /// Designs clothing from a description and selects it, which moves the
    /// wizard on to the try-on step.
    pub fn design_cloth(&mut self, description: &str) -> Result<ImageAsset> {
        if description.trim().is_empty() {
            return Err(WizardError::EmptyPrompt.into());
        }
        if self.state.selected_face().is_none() {
            return Err(WizardError::FaceRequired.into());
        }

        self.emit(
            "generation_started",
            map_object(json!({ "operation": "design", "prompt": description.trim() })),
        );
        let url = self
            .client
            .generate_clothing_from_text(description)
            .inspect_err(|err| self.emit_failure("design", err))?;

        let asset = ImageAsset::generated(url, AssetCategory::Cloth);
        self.emit(
            "generation_finished",
            map_object(json!({ "operation": "design", "asset_id": asset.id() })),
        );
        self.designed_cloths.insert(0, asset.clone());
        self.select_cloth(asset.clone())?;
        Ok(asset)
    }

    /// Runs the try-on for the current selections. Calling it again is the
    /// retry path: every call starts from scratch.
    pub fn generate_result(&mut self) -> Result<ImageAsset> {
        let face = self
            .state
            .selected_face()
            .cloned()
            .ok_or(WizardError::FaceRequired)?;
        let cloth = self
            .state
            .selected_cloth()
            .cloned()
            .ok_or(WizardError::ClothRequired)?;

        self.emit(
            "generation_started",
            map_object(json!({
                "operation": "try_on",
                "face_id": face.id(),
                "cloth_id": cloth.id(),
            })),
        );
        let url = self
            .client
            .generate_try_on(face.url(), cloth.url())
            .inspect_err(|err| self.emit_failure("try_on", err))?;

        let result = ImageAsset::generated(url, AssetCategory::Result);
        self.state.complete_generation(result.clone());
        self.emit(
            "generation_finished",
            map_object(json!({
                "operation": "try_on",
                "asset_id": result.id(),
                "history_len": self.state.history().len(),
            })),
        );
        Ok(result)
    }

    fn emit(&self, event_type: &str, payload: EventPayload) {
        emit_best_effort(self.events.as_ref(), event_type, payload);
    }

    fn emit_failure(&self, operation: &str, err: &WardrobeError) {
        self.emit(
            "generation_failed",
            map_object(json!({
                "operation": operation,
                "kind": err.kind(),
                "error": error_chain_text(err, 512),
            })),
        );
    }
}

fn asset_payload(asset: &ImageAsset) -> EventPayload {
    // Inline payloads can be megabytes; log only their shape.
    let url = if asset.is_inline() {
        Value::String(format!("data:…({} chars)", asset.url().len()))
    } else {
        Value::String(asset.url().to_string())
    };
    map_object(json!({
        "asset_id": asset.id(),
        "origin": asset.origin().as_str(),
        "category": asset.category().as_str(),
        "url": url,
    }))
}
