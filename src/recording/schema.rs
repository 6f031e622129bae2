//! Action log data structures.

use crate::selector::ElementSelector;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kinds of interactions the recorder captures.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Click,
    Input,
    Select,
    Scroll,
    Keypress,
    /// Placeholder for an interaction deferred to a human operator.
    ManualStep,
    Wait,
}

impl ActionKind {
    /// Page-level actions carry no locator; everything else does.
    pub fn requires_locator(&self) -> bool {
        !matches!(self, ActionKind::Scroll | ActionKind::Wait | ActionKind::ManualStep)
    }
}

/// One captured interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedAction {
    pub id: String,
    pub kind: ActionKind,
    /// Capture-time clock in unix ms; used for ordering and diagnostics only.
    pub timestamp_ms: u64,
    pub page_url: String,
    pub locator: Option<ElementSelector>,
    /// Typed text, selected option, key name, or scroll coordinates.
    pub value: Option<String>,
    /// Human-readable annotation; used by manual steps.
    pub description: Option<String>,
    /// Optional page snapshot taken alongside the action (base64 PNG).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

/// Per-recording metadata, recoverable from the generated script alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub target_site: Option<String>,
    pub manual_steps: usize,
}

/// A named, ordered capture session. Durable only as generated script text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub actions: Vec<RecordedAction>,
    pub metadata: RecordingMetadata,
}

impl Recording {
    pub fn new(name: String, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            description,
            created_at: now,
            updated_at: now,
            actions: Vec::new(),
            metadata: RecordingMetadata::default(),
        }
    }

    pub fn push_action(
        &mut self,
        kind: ActionKind,
        locator: Option<ElementSelector>,
        value: Option<String>,
        page_url: String,
    ) -> &RecordedAction {
        self.actions.push(RecordedAction {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            timestamp_ms: now_ms(),
            page_url,
            locator,
            value,
            description: None,
            screenshot: None,
        });
        self.actions.last().expect("just pushed")
    }
}

pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
