//! End-to-end pipeline tests: capture events through a fake page driver,
//! persist the generated script to disk, then replay it back.

use async_trait::async_trait;
use parking_lot::Mutex;
use rehearse::error::{RehearseError, Result};
use rehearse::recording::{Recorder, RecorderState};
use rehearse::replay::{Replayer, ReplayState};
use rehearse::script::store::{get_recording, list_recordings};
use rehearse::script::{FsScriptStore, ScriptStore};
use rehearse::wait::FixedDelay;
use rehearse::{PageDriver, SessionSaver};
use std::collections::VecDeque;
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Simulated page: hands out queued capture payloads on drain, logs every
/// script and navigation, and reports selectors in `missing` as unresolved.
#[derive(Default)]
struct FakeBrowser {
    drains: Mutex<VecDeque<serde_json::Value>>,
    scripts: Mutex<Vec<String>>,
    urls: Mutex<Vec<String>>,
    missing: Vec<String>,
}

#[async_trait]
impl PageDriver for FakeBrowser {
    async fn run_script(&self, code: &str) -> Result<serde_json::Value> {
        self.scripts.lock().push(code.to_string());
        if code.contains("__rehearseDrain ?") {
            return Ok(self
                .drains
                .lock()
                .pop_front()
                .unwrap_or_else(|| serde_json::json!("[]")));
        }
        for sel in &self.missing {
            if code.contains(&format!("findTarget('{}')", sel)) {
                return Ok(serde_json::json!(false));
            }
        }
        Ok(serde_json::json!(true))
    }

    async fn load_url(&self, url: &str) -> Result<()> {
        self.urls.lock().push(url.to_string());
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok("https://shop.example/checkout".to_string())
    }

    async fn capture_page(&self) -> Result<String> {
        Ok("iVBORw0KGgo=".to_string())
    }
}

#[derive(Default)]
struct DomainLog {
    domains: Mutex<Vec<String>>,
}

#[async_trait]
impl SessionSaver for DomainLog {
    async fn save_session(&self, domain: &str) -> Result<()> {
        self.domains.lock().push(domain.to_string());
        Ok(())
    }
}

fn capture_payload() -> serde_json::Value {
    // What the in-page queue would hold after: click #go, type "h" then
    // "he" into #q (consolidates to one fill), press Enter.
    serde_json::json!(
        "[\
{\"kind\":\"click\",\"snapshot\":{\"node\":{\"tag\":\"button\",\"id\":\"go\",\"classes\":[],\"sibling_index\":1},\"text\":\"Go\",\"ancestors\":[]},\"value\":null,\"page_url\":\"https://shop.example/checkout\"},\
{\"kind\":\"input\",\"snapshot\":{\"node\":{\"tag\":\"input\",\"id\":\"q\",\"classes\":[],\"sibling_index\":1},\"ancestors\":[]},\"value\":\"h\",\"page_url\":\"https://shop.example/checkout\"},\
{\"kind\":\"input\",\"snapshot\":{\"node\":{\"tag\":\"input\",\"id\":\"q\",\"classes\":[],\"sibling_index\":1},\"ancestors\":[]},\"value\":\"he\",\"page_url\":\"https://shop.example/checkout\"},\
{\"kind\":\"keypress\",\"snapshot\":{\"node\":{\"tag\":\"input\",\"id\":\"q\",\"classes\":[],\"sibling_index\":1},\"ancestors\":[]},\"value\":\"Enter\",\"page_url\":\"https://shop.example/checkout\"}]"
    )
}

fn zero_delay() -> Arc<FixedDelay> {
    Arc::new(FixedDelay {
        navigation_ms: 0,
        command_ms: 0,
    })
}

#[tokio::test]
async fn test_record_generate_persist_then_replay() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsScriptStore::new(dir.path().join("scripts")).unwrap());

    // Record.
    let browser = Arc::new(FakeBrowser::default());
    browser.drains.lock().push_back(capture_payload());

    let recorder = Recorder::new(store.clone());
    let id = recorder
        .start(browser.clone(), "checkout flow", Some("buy a thing".to_string()))
        .await
        .unwrap();
    assert_eq!(recorder.state(), RecorderState::Recording);

    let appended = recorder.poll_captured().await.unwrap();
    assert_eq!(appended, 4);
    recorder.add_manual_step("Solve the captcha").await.unwrap();

    let recording = recorder.stop().await.unwrap();
    assert_eq!(recorder.state(), RecorderState::Idle);
    assert_eq!(recording.metadata.manual_steps, 1);

    // The stored script carries the preamble, the navigate to the capture
    // page, the consolidated fill, and the manual step comment.
    let text = store.read(&id).unwrap();
    assert!(text.starts_with("import { test, expect } from '@playwright/test';"));
    assert!(text.contains(&format!("// Recording ID: {}", id)));
    assert!(text.contains("navigate('https://shop.example/checkout');"));
    assert!(text.contains("click('#go');"));
    assert!(text.contains("fill('#q', 'he');"));
    assert!(!text.contains("'h'"));
    assert!(text.contains("keyPress('Enter');"));
    assert!(text.contains("// MANUAL STEP: Solve the captcha"));

    // The listener was uninstalled on stop.
    let scripts = browser.scripts.lock();
    assert!(scripts.iter().any(|s| s.contains("removeEventListener")));
    drop(scripts);

    // Catalog.
    let summaries = list_recordings(store.as_ref()).unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].name, "checkout flow");
    assert_eq!(summaries[0].manual_steps, 1);
    assert_eq!(
        summaries[0].target_site.as_deref(),
        Some("https://shop.example/checkout")
    );
    assert!(get_recording(store.as_ref(), &id).is_ok());

    // Replay against a fresh page.
    let stage = Arc::new(FakeBrowser::default());
    let saver = Arc::new(DomainLog::default());
    let replayer = Replayer::new(store.clone())
        .with_wait_strategy(zero_delay())
        .with_session_saver(saver.clone());

    let report = replayer.start_replay(stage.clone(), &id).await.unwrap();
    assert!(report.fully_succeeded());
    assert_eq!(replayer.status(), ReplayState::Completed);
    assert_eq!(
        stage.urls.lock().as_slice(),
        ["https://shop.example/checkout"]
    );
    // navigate is a driver call, the other three commands run as scripts.
    assert_eq!(report.outcomes.len(), 4);
    assert_eq!(saver.domains.lock().as_slice(), ["shop.example"]);
}

#[tokio::test]
async fn test_replay_isolates_command_failures() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsScriptStore::new(dir.path().join("scripts")).unwrap());
    store
        .write(
            "drifted",
            "\
import { test, expect } from '@playwright/test';

// Recording ID: drifted
test('drifted', async ({ page }) => {
  navigate('https://shop.example/');
  click('#gone-after-redesign');
  fill('#q', 'boots');
  click('#search');
});
",
        )
        .unwrap();

    let stage = Arc::new(FakeBrowser {
        missing: vec!["#gone-after-redesign".to_string()],
        ..Default::default()
    });
    let replayer = Replayer::new(store).with_wait_strategy(zero_delay());

    let report = replayer.start_replay(stage, "drifted").await.unwrap();
    assert_eq!(report.outcomes.len(), 4);
    assert_eq!(report.failed(), 1);
    assert!(!report.outcomes[1].ok);
    assert!(report.outcomes[1]
        .error
        .as_deref()
        .unwrap()
        .contains("#gone-after-redesign"));
    // Everything after the missing element still executed.
    assert!(report.outcomes[2].ok);
    assert!(report.outcomes[3].ok);
    assert_eq!(replayer.status(), ReplayState::Completed);
}

#[tokio::test]
async fn test_recorder_rejects_second_session() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsScriptStore::new(dir.path().join("scripts")).unwrap());
    let browser = Arc::new(FakeBrowser::default());

    let recorder = Recorder::new(store);
    recorder.start(browser.clone(), "one", None).await.unwrap();
    let err = recorder.start(browser, "two", None).await.unwrap_err();
    assert!(matches!(err, RehearseError::AlreadyRecording));
    assert_eq!(
        recorder.current_recording().map(|r| r.name),
        Some("one".to_string())
    );
}

#[tokio::test]
async fn test_paused_recorder_drops_captures_silently() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsScriptStore::new(dir.path().join("scripts")).unwrap());
    let browser = Arc::new(FakeBrowser::default());
    browser.drains.lock().push_back(capture_payload());

    let recorder = Recorder::new(store);
    recorder.start(browser.clone(), "paused", None).await.unwrap();
    recorder.pause().unwrap();

    let appended = recorder.poll_captured().await.unwrap();
    assert_eq!(appended, 0);

    recorder.resume().unwrap();
    let recording = recorder.stop().await.unwrap();
    assert!(recording.actions.is_empty());
}
