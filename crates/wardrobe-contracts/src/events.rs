use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

pub type EventPayload = Map<String, Value>;

/// Session diagnostics log, one JSON object per line.
///
/// Every row is stamped with `type`, `session_id` and an RFC 3339 `ts`;
/// payload keys are applied afterwards. Clones share the file and its lock, so
/// the resolver and the session can log into the same stream.
#[derive(Debug, Clone)]
pub struct EventWriter {
    shared: Arc<SessionLog>,
}

#[derive(Debug)]
struct SessionLog {
    path: PathBuf,
    session_id: String,
    append: Mutex<()>,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(SessionLog {
                path: path.into(),
                session_id: session_id.into(),
                append: Mutex::new(()),
            }),
        }
    }

    /// Writer with a fresh `session-<uuid>` id.
    pub fn for_new_session(path: impl Into<PathBuf>) -> Self {
        Self::new(path, format!("session-{}", Uuid::new_v4()))
    }

    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    pub fn session_id(&self) -> &str {
        &self.shared.session_id
    }

    /// Appends one row and returns it as written.
    pub fn emit(&self, event_type: &str, payload: EventPayload) -> anyhow::Result<Value> {
        let mut row = EventPayload::new();
        row.insert("type".into(), event_type.into());
        row.insert("session_id".into(), self.session_id().into());
        row.insert(
            "ts".into(),
            Utc::now()
                .to_rfc3339_opts(SecondsFormat::Micros, false)
                .into(),
        );
        row.extend(payload);

        let mut line = serde_json::to_string(&row)?;
        line.push('\n');

        if let Some(dir) = self.shared.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let _guard = self
            .shared
            .append
            .lock()
            .map_err(|_| anyhow::anyhow!("session log lock poisoned"))?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.shared.path)?
            .write_all(line.as_bytes())?;

        Ok(Value::Object(row))
    }
}

/// Emits to an optional writer; diagnostics must never fail the caller.
pub fn emit_best_effort(events: Option<&EventWriter>, event_type: &str, payload: EventPayload) {
    if let Some(events) = events {
        let _ = events.emit(event_type, payload);
    }
}
