use crate::wait::{FixedDelay, PollReadiness, WaitStrategy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Directory for stored scripts. Defaults to `~/.rehearse/scripts`.
    #[serde(default)]
    pub scripts_dir: Option<PathBuf>,

    /// Capture-side settings
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Replay-side settings
    #[serde(default)]
    pub replay: ReplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// How often the recorder drains the in-page event queue, in ms
    #[serde(default = "default_drain_interval_ms")]
    pub drain_interval_ms: u64,

    /// Attach a screenshot to recorded manual steps
    #[serde(default = "default_true")]
    pub manual_step_screenshots: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            drain_interval_ms: default_drain_interval_ms(),
            manual_step_screenshots: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Fixed settle delay after a navigation, in ms
    #[serde(default = "default_navigation_settle_ms")]
    pub navigation_settle_ms: u64,

    /// Fixed settle delay after any other command, in ms
    #[serde(default = "default_command_settle_ms")]
    pub command_settle_ms: u64,

    /// Poll document readiness instead of sleeping for a fixed delay
    #[serde(default)]
    pub poll_readiness: bool,

    /// Upper bound for a readiness poll after navigation, in ms
    #[serde(default = "default_readiness_timeout_ms")]
    pub readiness_timeout_ms: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            navigation_settle_ms: default_navigation_settle_ms(),
            command_settle_ms: default_command_settle_ms(),
            poll_readiness: false,
            readiness_timeout_ms: default_readiness_timeout_ms(),
        }
    }
}

impl ReplayConfig {
    /// Build the wait strategy this configuration describes.
    pub fn wait_strategy(&self) -> Arc<dyn WaitStrategy> {
        if self.poll_readiness {
            Arc::new(PollReadiness {
                navigation_timeout_ms: self.readiness_timeout_ms,
                command_timeout_ms: self.command_settle_ms.max(500),
                ..Default::default()
            })
        } else {
            Arc::new(FixedDelay {
                navigation_ms: self.navigation_settle_ms,
                command_ms: self.command_settle_ms,
            })
        }
    }
}

fn default_drain_interval_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

fn default_navigation_settle_ms() -> u64 {
    2000
}

fn default_command_settle_ms() -> u64 {
    500
}

fn default_readiness_timeout_ms() -> u64 {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.scripts_dir.is_none());
        assert_eq!(config.replay.navigation_settle_ms, 2000);
        assert_eq!(config.replay.command_settle_ms, 500);
        assert!(!config.replay.poll_readiness);
        assert!(config.capture.manual_step_screenshots);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
[replay]
poll_readiness = true
"#,
        )
        .unwrap();
        assert!(config.replay.poll_readiness);
        assert_eq!(config.replay.readiness_timeout_ms, 10_000);
        assert_eq!(config.capture.drain_interval_ms, 500);
    }
}
