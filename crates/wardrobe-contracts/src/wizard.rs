use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assets::ImageAsset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    SelectFace = 1,
    SelectCloth = 2,
    GenerateResult = 3,
}

impl WizardStep {
    pub const ALL: [WizardStep; 3] = [
        WizardStep::SelectFace,
        WizardStep::SelectCloth,
        WizardStep::GenerateResult,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|step| step.number() == value)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::SelectFace => "model",
            Self::SelectCloth => "outfit",
            Self::GenerateResult => "try-on",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("choose a model photo before picking clothing")]
    FaceRequired,
    #[error("choose clothing before generating a try-on")]
    ClothRequired,
    #[error("describe the clothing to design")]
    EmptyPrompt,
}

/// Wizard progress for one session.
///
/// Fields are only reachable through the four transitions below, which keeps
/// the step ordering and the append-only history intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardState {
    current_step: WizardStep,
    selected_face: Option<ImageAsset>,
    selected_cloth: Option<ImageAsset>,
    generated_result: Option<ImageAsset>,
    history: VecDeque<ImageAsset>,
}

impl Default for WizardState {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardState {
    pub fn new() -> Self {
        Self {
            current_step: WizardStep::SelectFace,
            selected_face: None,
            selected_cloth: None,
            generated_result: None,
            history: VecDeque::new(),
        }
    }

    pub fn current_step(&self) -> WizardStep {
        self.current_step
    }

    pub fn selected_face(&self) -> Option<&ImageAsset> {
        self.selected_face.as_ref()
    }

    pub fn selected_cloth(&self) -> Option<&ImageAsset> {
        self.selected_cloth.as_ref()
    }

    pub fn generated_result(&self) -> Option<&ImageAsset> {
        self.generated_result.as_ref()
    }

    /// Results, most recent first.
    pub fn history(&self) -> impl ExactSizeIterator<Item = &ImageAsset> {
        self.history.iter()
    }

    // A previously chosen cloth survives a face change.
    pub fn select_face(&mut self, asset: ImageAsset) {
        self.selected_face = Some(asset);
        self.current_step = WizardStep::SelectCloth;
    }

    pub fn select_cloth(&mut self, asset: ImageAsset) -> Result<(), WizardError> {
        if self.selected_face.is_none() {
            return Err(WizardError::FaceRequired);
        }
        self.selected_cloth = Some(asset);
        self.current_step = WizardStep::GenerateResult;
        Ok(())
    }

    pub fn complete_generation(&mut self, result: ImageAsset) {
        self.history.push_front(result.clone());
        self.generated_result = Some(result);
    }

    /// Returns `false` (and leaves the state alone) when `step` lies ahead of
    /// the current step.
    pub fn navigate_to(&mut self, step: WizardStep) -> bool {
        if step > self.current_step {
            return false;
        }
        self.current_step = step;
        true
    }
}
