//! Recorder state machine: `idle → recording ⇄ paused → idle`.

use crate::driver::PageDriver;
use crate::error::{RehearseError, Result};
use crate::recording::inject;
use crate::recording::schema::{now_ms, ActionKind, RecordedAction, Recording};
use crate::script::generator;
use crate::script::store::ScriptStore;
use crate::selector::{self, ElementSelector};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
    Paused,
}

struct Inner {
    state: RecorderState,
    current: Option<Recording>,
    driver: Option<Arc<dyn PageDriver>>,
}

/// Owns the single in-progress recording. One recorder session at a time;
/// every public entry point checks state synchronously under the lock.
pub struct Recorder {
    store: Arc<dyn ScriptStore>,
    inner: Mutex<Inner>,
}

impl Recorder {
    pub fn new(store: Arc<dyn ScriptStore>) -> Self {
        Self {
            store,
            inner: Mutex::new(Inner {
                state: RecorderState::Idle,
                current: None,
                driver: None,
            }),
        }
    }

    pub fn state(&self) -> RecorderState {
        self.inner.lock().state
    }

    /// Snapshot of the in-progress recording, if any.
    pub fn current_recording(&self) -> Option<Recording> {
        self.inner.lock().current.clone()
    }

    /// Start capturing into a fresh recording. Installs the capture listener
    /// into the target page; if installation fails the transition is rolled
    /// back and the recorder is left in `idle` with no partial state.
    pub async fn start(
        &self,
        driver: Arc<dyn PageDriver>,
        name: &str,
        description: Option<String>,
    ) -> Result<String> {
        {
            let mut inner = self.inner.lock();
            if inner.state != RecorderState::Idle {
                return Err(RehearseError::AlreadyRecording);
            }
            inner.state = RecorderState::Recording;
            inner.current = Some(Recording::new(name.to_string(), description));
            inner.driver = Some(driver.clone());
        }

        if let Err(e) = driver.run_script(inject::CAPTURE_LISTENER_JS).await {
            let mut inner = self.inner.lock();
            inner.state = RecorderState::Idle;
            inner.current = None;
            inner.driver = None;
            return Err(RehearseError::Injection(e.to_string()));
        }

        let target_site = driver.current_url().await.ok();
        let mut inner = self.inner.lock();
        let id = match inner.current.as_mut() {
            Some(recording) => {
                recording.metadata.target_site = target_site;
                recording.id.clone()
            }
            // Stopped concurrently between install and here; treat as rolled back.
            None => return Err(RehearseError::NotRecording),
        };

        tracing::info!("Recording started: {} ({})", name, id);
        Ok(id)
    }

    pub fn pause(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.state != RecorderState::Recording {
            return Err(RehearseError::NotRecording);
        }
        inner.state = RecorderState::Paused;
        tracing::debug!("Recording paused");
        Ok(())
    }

    pub fn resume(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.state != RecorderState::Paused {
            return Err(RehearseError::NotRecording);
        }
        inner.state = RecorderState::Recording;
        tracing::debug!("Recording resumed");
        Ok(())
    }

    /// Append one captured action. This is the event-driven path: anything
    /// arriving while the recorder is not exactly `recording` is silently
    /// dropped, never an error, because the capture listener is a background
    /// producer that cannot observe pause transitions itself.
    pub fn record_action(
        &self,
        kind: ActionKind,
        locator: Option<ElementSelector>,
        value: Option<String>,
        page_url: String,
    ) {
        self.append(kind, locator, value, page_url);
    }

    fn append(
        &self,
        kind: ActionKind,
        locator: Option<ElementSelector>,
        value: Option<String>,
        page_url: String,
    ) -> bool {
        let mut inner = self.inner.lock();
        if inner.state != RecorderState::Recording {
            tracing::trace!("Dropping {:?} captured outside recording state", kind);
            return false;
        }
        if kind.requires_locator() && locator.as_ref().map_or(true, |l| l.is_empty()) {
            tracing::warn!("Dropping {:?} action without locator", kind);
            return false;
        }
        if let Some(recording) = inner.current.as_mut() {
            recording.push_action(kind, locator, value, page_url);
            return true;
        }
        false
    }

    /// Drain the in-page capture queue and append the resulting actions.
    /// Returns the number of actions appended (drained events are dropped,
    /// not buffered, while the recorder is paused).
    pub async fn poll_captured(&self) -> Result<usize> {
        let driver = {
            let inner = self.inner.lock();
            match (&inner.state, &inner.driver) {
                (RecorderState::Idle, _) | (_, None) => return Ok(0),
                (_, Some(driver)) => driver.clone(),
            }
        };

        let payload = driver.run_script(inject::DRAIN_QUEUE_JS).await?;
        let events = inject::parse_drained(&payload);

        let mut appended = 0;
        for event in events {
            let locator = event.snapshot.as_ref().map(selector::resolve);
            if self.append(event.kind, locator, event.value, event.page_url) {
                appended += 1;
            }
        }
        Ok(appended)
    }

    /// Append a manual-step placeholder with a snapshot of the current page.
    /// Operator-invoked, so unlike the event-driven path this errors when no
    /// recording is active; pause does not matter here.
    pub async fn add_manual_step(&self, description: &str) -> Result<()> {
        let driver = {
            let inner = self.inner.lock();
            if inner.state == RecorderState::Idle {
                return Err(RehearseError::NotRecording);
            }
            inner.driver.clone()
        };

        let screenshot = match driver {
            Some(driver) => match driver.capture_page().await {
                Ok(image) => Some(image),
                Err(e) => {
                    tracing::warn!("Manual step snapshot failed: {}", e);
                    None
                }
            },
            None => None,
        };

        let mut inner = self.inner.lock();
        let recording = inner.current.as_mut().ok_or(RehearseError::NotRecording)?;
        recording.actions.push(RecordedAction {
            id: uuid::Uuid::new_v4().to_string(),
            kind: ActionKind::ManualStep,
            timestamp_ms: now_ms(),
            page_url: recording.metadata.target_site.clone().unwrap_or_default(),
            locator: None,
            value: None,
            description: Some(description.to_string()),
            screenshot,
        });
        recording.metadata.manual_steps += 1;
        tracing::info!("Manual step added: {}", description);
        Ok(())
    }

    /// Finalize the current recording: drain remaining captures, generate the
    /// script, persist it, uninstall the listener, and reset to `idle`. This
    /// is the only point at which a recording becomes durable.
    pub async fn stop(&self) -> Result<Recording> {
        // Final drain while still active; failures here must not block stop.
        if let Err(e) = self.poll_captured().await {
            tracing::warn!("Final capture drain failed: {}", e);
        }

        let (mut recording, driver) = {
            let mut inner = self.inner.lock();
            if inner.state == RecorderState::Idle {
                return Err(RehearseError::NotRecording);
            }
            inner.state = RecorderState::Idle;
            let recording = inner.current.take().ok_or(RehearseError::NotRecording)?;
            (recording, inner.driver.take())
        };

        recording.updated_at = chrono::Utc::now();
        let script = generator::generate(&recording);
        self.store.write(&recording.id, &script)?;

        if let Some(driver) = driver {
            if let Err(e) = driver.run_script(inject::UNINSTALL_LISTENER_JS).await {
                tracing::warn!("Capture listener uninstall failed: {}", e);
            }
        }

        tracing::info!(
            "Recording stopped: {} ({} actions, {} manual steps)",
            recording.id,
            recording.actions.len(),
            recording.metadata.manual_steps
        );
        Ok(recording)
    }
}
