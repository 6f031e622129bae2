//! Replay executor: drives a live page from stored script text.
//!
//! Execution is best-effort: every command runs inside its own error
//! boundary, failures are recorded in the replay report and the loop moves
//! on. Drift between record time and replay time therefore degrades a
//! replay instead of aborting it.

use crate::driver::{PageDriver, SessionSaver};
use crate::error::{RehearseError, Result};
use crate::replay::command::{Command, LineParser, ScriptParser};
use crate::script::header;
use crate::script::header::escape_single_quoted;
use crate::script::store::ScriptStore;
use crate::wait::{FixedDelay, WaitStrategy};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayState {
    Idle,
    Running,
    Paused,
    Completed,
    Error,
}

/// Result of one executed command.
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutcome {
    /// 1-based line in the script text.
    pub line: usize,
    pub command: String,
    pub ok: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Per-command outcomes for one replay, so callers can tell "3 of 5 failed"
/// apart from full success.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub recording_id: String,
    pub outcomes: Vec<CommandOutcome>,
    /// Remaining lines were discarded by an operator stop.
    pub stopped_early: bool,
}

impl ReplayReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.ok).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn fully_succeeded(&self) -> bool {
        self.failed() == 0
    }
}

pub type StatusObserver = Box<dyn Fn(ReplayState) + Send + Sync>;

/// Reads a stored script and reproduces it against a page driver. One replay
/// session at a time, enforced by state checks at the entry point.
pub struct Replayer {
    store: Arc<dyn ScriptStore>,
    parser: Box<dyn ScriptParser>,
    wait: Arc<dyn WaitStrategy>,
    session_saver: Option<Arc<dyn SessionSaver>>,
    state: Mutex<ReplayState>,
    stop_requested: AtomicBool,
    observer: Mutex<Option<StatusObserver>>,
}

impl Replayer {
    pub fn new(store: Arc<dyn ScriptStore>) -> Self {
        Self {
            store,
            parser: Box::new(LineParser),
            wait: Arc::new(FixedDelay::default()),
            session_saver: None,
            state: Mutex::new(ReplayState::Idle),
            stop_requested: AtomicBool::new(false),
            observer: Mutex::new(None),
        }
    }

    pub fn with_parser(mut self, parser: Box<dyn ScriptParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_wait_strategy(mut self, wait: Arc<dyn WaitStrategy>) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_session_saver(mut self, saver: Arc<dyn SessionSaver>) -> Self {
        self.session_saver = Some(saver);
        self
    }

    /// Register a status-change observer for the sessions that follow.
    pub fn set_observer(&self, observer: StatusObserver) {
        *self.observer.lock() = Some(observer);
    }

    pub fn status(&self) -> ReplayState {
        *self.state.lock()
    }

    /// Cooperative pause: takes effect before the next line, never
    /// interrupting an in-flight page call. No-op unless running.
    pub fn pause(&self) {
        let mut state = self.state.lock();
        if *state == ReplayState::Running {
            *state = ReplayState::Paused;
            drop(state);
            self.notify(ReplayState::Paused);
        }
    }

    /// No-op unless paused.
    pub fn resume(&self) {
        let mut state = self.state.lock();
        if *state == ReplayState::Paused {
            *state = ReplayState::Running;
            drop(state);
            self.notify(ReplayState::Running);
        }
    }

    /// Discard all remaining lines at the next checkpoint.
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    fn notify(&self, state: ReplayState) {
        if let Some(observer) = &*self.observer.lock() {
            observer(state);
        }
    }

    fn transition(&self, state: ReplayState) {
        *self.state.lock() = state;
        self.notify(state);
    }

    /// Replay a stored recording against `driver`, line by line.
    pub async fn start_replay(
        &self,
        driver: Arc<dyn PageDriver>,
        recording_id: &str,
    ) -> Result<ReplayReport> {
        {
            let state = self.state.lock();
            if matches!(*state, ReplayState::Running | ReplayState::Paused) {
                return Err(RehearseError::AlreadyReplaying);
            }
        }

        // An unreadable script aborts before any state change.
        let text = self.store.read(recording_id)?;
        let target_site = header::parse(&text).target_site;
        let commands = self.parser.parse(&text);

        self.stop_requested.store(false, Ordering::SeqCst);
        self.transition(ReplayState::Running);
        tracing::info!(
            "Replay started: {} ({} commands)",
            recording_id,
            commands.len()
        );

        let mut report = ReplayReport {
            recording_id: recording_id.to_string(),
            outcomes: Vec::with_capacity(commands.len()),
            stopped_early: false,
        };

        for (line, command) in commands {
            // Checkpoint: stop discards the rest, pause parks the loop.
            if self.stop_requested.load(Ordering::SeqCst) {
                report.stopped_early = true;
                break;
            }
            while self.status() == ReplayState::Paused {
                if self.stop_requested.load(Ordering::SeqCst) {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            if self.stop_requested.load(Ordering::SeqCst) {
                report.stopped_early = true;
                break;
            }

            let rendered = format!("{:?}", command);
            let started = std::time::Instant::now();
            let outcome = match self.execute(driver.as_ref(), &command).await {
                Ok(()) => CommandOutcome {
                    line,
                    command: rendered,
                    ok: true,
                    error: None,
                    duration_ms: started.elapsed().as_millis() as u64,
                },
                Err(e) => {
                    tracing::warn!("Replay command at line {} failed: {}", line, e);
                    CommandOutcome {
                        line,
                        command: rendered,
                        ok: false,
                        error: Some(e.to_string()),
                        duration_ms: started.elapsed().as_millis() as u64,
                    }
                }
            };
            report.outcomes.push(outcome);
        }

        let final_state = if report.stopped_early {
            ReplayState::Idle
        } else if !report.outcomes.is_empty() && report.succeeded() == 0 {
            ReplayState::Error
        } else {
            ReplayState::Completed
        };
        self.transition(final_state);

        if final_state == ReplayState::Completed {
            if let (Some(saver), Some(site)) = (&self.session_saver, &target_site) {
                if let Some(domain) = domain_of(site) {
                    if let Err(e) = saver.save_session(&domain).await {
                        tracing::warn!("Post-replay session save failed: {}", e);
                    }
                }
            }
        }

        tracing::info!(
            "Replay finished: {} ({} ok, {} failed)",
            recording_id,
            report.succeeded(),
            report.failed()
        );
        Ok(report)
    }

    async fn execute(&self, driver: &dyn PageDriver, command: &Command) -> Result<()> {
        match command {
            Command::Navigate { url } => {
                driver.load_url(url).await?;
                self.wait.after_navigation(driver).await;
            }
            Command::Click { selector } => {
                self.run_targeting(driver, &click_js(selector), selector).await?;
                self.wait.after_command(driver).await;
            }
            Command::Fill { selector, value } => {
                self.run_targeting(driver, &fill_js(selector, value), selector).await?;
                self.wait.after_command(driver).await;
            }
            Command::KeyPress { key } => {
                driver.run_script(&keypress_js(key)).await?;
                self.wait.after_command(driver).await;
            }
            Command::SelectOption { selector, value } => {
                self.run_targeting(driver, &select_js(selector, value), selector).await?;
                self.wait.after_command(driver).await;
            }
            Command::Evaluate { code } => {
                driver.run_script(code).await?;
                self.wait.after_command(driver).await;
            }
            Command::WaitTimeout { ms } => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
        }
        Ok(())
    }

    /// Run a snippet that evaluates to `false` when its target element could
    /// not be resolved in the live page.
    async fn run_targeting(
        &self,
        driver: &dyn PageDriver,
        code: &str,
        selector: &str,
    ) -> Result<()> {
        let value = driver.run_script(code).await?;
        if value.as_bool() == Some(false) {
            return Err(RehearseError::Driver(format!(
                "element not found: {}",
                selector
            )));
        }
        Ok(())
    }
}

/// Host part of a URL, for the post-replay session save.
fn domain_of(url: &str) -> Option<String> {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    let host = rest.split(['/', '?', '#']).next()?;
    let host = host.split('@').last()?.split(':').next()?;
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

/// Shared selector resolution inside the page. Understands the generated
/// locator forms: `#id` / raw css, `[name="..."]`, `text=...`, `xpath=...`.
const FIND_TARGET_JS: &str = r#"
  function findTarget(sel) {
    if (sel.indexOf('xpath=') === 0) {
      var res = document.evaluate(sel.slice(6), document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null);
      return res.singleNodeValue;
    }
    if (sel.indexOf('text=') === 0) {
      var want = sel.slice(5);
      var all = document.querySelectorAll('a, button, input, select, textarea, label, [role], li, td, th, span, div, p, h1, h2, h3, h4, h5, h6');
      for (var i = 0; i < all.length; i++) {
        if (all[i].textContent && all[i].textContent.trim() === want) { return all[i]; }
      }
      return null;
    }
    try { return document.querySelector(sel); } catch (e) { return null; }
  }
"#;

fn click_js(selector: &str) -> String {
    format!(
        r#"(function () {{
{helper}
  var el = findTarget('{selector}');
  if (!el) {{ return false; }}
  el.scrollIntoView({{ block: 'center' }});
  el.click();
  return true;
}})()"#,
        helper = FIND_TARGET_JS,
        selector = escape_single_quoted(selector)
    )
}

fn fill_js(selector: &str, value: &str) -> String {
    // Dispatch both input and change so framework-bound listeners observe
    // the programmatic update.
    format!(
        r#"(function () {{
{helper}
  var el = findTarget('{selector}');
  if (!el) {{ return false; }}
  el.focus();
  el.value = '{value}';
  el.dispatchEvent(new Event('input', {{ bubbles: true }}));
  el.dispatchEvent(new Event('change', {{ bubbles: true }}));
  return true;
}})()"#,
        helper = FIND_TARGET_JS,
        selector = escape_single_quoted(selector),
        value = escape_single_quoted(value)
    )
}

fn keypress_js(key: &str) -> String {
    // Synthetic key events never trigger the browser's native default
    // action, so Enter inside a form submits the form explicitly.
    format!(
        r#"(function () {{
  var el = document.activeElement || document.body;
  var opts = {{ key: '{key}', bubbles: true, cancelable: true }};
  el.dispatchEvent(new KeyboardEvent('keydown', opts));
  el.dispatchEvent(new KeyboardEvent('keypress', opts));
  el.dispatchEvent(new KeyboardEvent('keyup', opts));
  if ('{key}' === 'Enter' && el.form) {{
    el.form.submit();
  }}
  return true;
}})()"#,
        key = escape_single_quoted(key)
    )
}

fn select_js(selector: &str, value: &str) -> String {
    format!(
        r#"(function () {{
{helper}
  var el = findTarget('{selector}');
  if (!el) {{ return false; }}
  el.value = '{value}';
  el.dispatchEvent(new Event('change', {{ bubbles: true }}));
  return true;
}})()"#,
        helper = FIND_TARGET_JS,
        selector = escape_single_quoted(selector),
        value = escape_single_quoted(value)
    )
}
