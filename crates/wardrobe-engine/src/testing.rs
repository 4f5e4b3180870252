use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use crate::error::{FetchError, Result};
use crate::generation::{GenerationBackend, GenerationRequest};
use crate::resolver::{FetchedImage, ImageFetcher};

/// Fetcher that replays scripted outcomes in order. `Err(0)` stands for a
/// network failure, any other code for an HTTP status.
pub(crate) struct ScriptedFetcher {
    outcomes: Mutex<VecDeque<std::result::Result<FetchedImage, u16>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedFetcher {
    pub(crate) fn new(outcomes: Vec<std::result::Result<FetchedImage, u16>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        self.calls.clone()
    }
}

impl ImageFetcher for ScriptedFetcher {
    fn fetch(&self, url: &str) -> std::result::Result<FetchedImage, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.outcomes.lock().unwrap().pop_front() {
            Some(Ok(image)) => Ok(image),
            Some(Err(0)) | None => Err(FetchError::Network {
                url: url.to_string(),
                source: "connection refused".into(),
            }),
            Some(Err(status)) => Err(FetchError::Status {
                url: url.to_string(),
                status,
            }),
        }
    }
}

pub(crate) struct RecordingBackend {
    answers: Mutex<VecDeque<Result<Value>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl RecordingBackend {
    pub(crate) fn new(answers: Vec<Result<Value>>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn requests(&self) -> Arc<Mutex<Vec<GenerationRequest>>> {
        self.requests.clone()
    }
}

impl GenerationBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    fn generate_content(&self, request: &GenerationRequest) -> Result<Value> {
        self.requests.lock().unwrap().push(request.clone());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({ "candidates": [] })))
    }
}

pub(crate) fn image_response(mime_type: &str, data: &str) -> Value {
    json!({
        "candidates": [{
            "content": {
                "parts": [
                    { "text": "done" },
                    { "inlineData": { "mimeType": mime_type, "data": data } }
                ]
            }
        }]
    })
}
