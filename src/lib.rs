//! Record and replay browser workflows.
//!
//! A [`Recorder`] installs an in-page capture listener through a
//! [`PageDriver`], turns drained DOM events into a [`Recording`], and on
//! stop persists a Playwright-style script through a [`ScriptStore`]. A
//! [`Replayer`] reads the script back and reproduces it command by
//! command, collecting per-command outcomes in a [`ReplayReport`].

pub mod config;
pub mod driver;
pub mod error;
pub mod recording;
pub mod replay;
pub mod script;
pub mod selector;
pub mod wait;

pub use config::AppConfig;
pub use driver::{CdpDriver, PageDriver, SessionSaver};
pub use error::{RehearseError, Result};
pub use recording::{ActionKind, RecordedAction, Recorder, RecorderState, Recording};
pub use replay::{CommandOutcome, Replayer, ReplayReport, ReplayState};
pub use script::{FsScriptStore, RecordingSummary, ScriptStore};
pub use selector::{ElementSelector, ElementSnapshot};
pub use wait::{FixedDelay, PollReadiness, WaitStrategy};
