//! Pacing between replay commands.
//!
//! The baseline strategy reproduces the recorded-session timing model:
//! fixed sleeps after navigation and after each command. [`PollReadiness`]
//! replaces the sleeps with a readiness poll for pages where fixed delays
//! are too flaky or too slow.

use crate::driver::PageDriver;
use async_trait::async_trait;
use std::time::Duration;

/// How long to let the page settle after a side effect.
#[async_trait]
pub trait WaitStrategy: Send + Sync {
    async fn after_navigation(&self, driver: &dyn PageDriver);
    async fn after_command(&self, driver: &dyn PageDriver);
}

/// Fixed sleeps. Defaults match the recorded baseline: 2000 ms after a
/// navigation, 500 ms after any other command.
#[derive(Debug, Clone)]
pub struct FixedDelay {
    pub navigation_ms: u64,
    pub command_ms: u64,
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self {
            navigation_ms: 2000,
            command_ms: 500,
        }
    }
}

#[async_trait]
impl WaitStrategy for FixedDelay {
    async fn after_navigation(&self, _driver: &dyn PageDriver) {
        tokio::time::sleep(Duration::from_millis(self.navigation_ms)).await;
    }

    async fn after_command(&self, _driver: &dyn PageDriver) {
        tokio::time::sleep(Duration::from_millis(self.command_ms)).await;
    }
}

/// Poll `document.readyState` until the page reports complete, up to a
/// timeout, then fall through. Failures to evaluate count as "not ready".
#[derive(Debug, Clone)]
pub struct PollReadiness {
    pub navigation_timeout_ms: u64,
    pub command_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for PollReadiness {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: 10_000,
            command_timeout_ms: 2_000,
            poll_interval_ms: 100,
        }
    }
}

impl PollReadiness {
    async fn poll(&self, driver: &dyn PageDriver, timeout_ms: u64) {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            let ready = driver
                .run_script("document.readyState")
                .await
                .ok()
                .and_then(|v| v.as_str().map(|s| s == "complete"))
                .unwrap_or(false);
            if ready {
                return;
            }
            if tokio::time::Instant::now() >= deadline {
                tracing::debug!("Readiness poll timed out after {}ms", timeout_ms);
                return;
            }
            tokio::time::sleep(Duration::from_millis(self.poll_interval_ms)).await;
        }
    }
}

#[async_trait]
impl WaitStrategy for PollReadiness {
    async fn after_navigation(&self, driver: &dyn PageDriver) {
        self.poll(driver, self.navigation_timeout_ms).await;
    }

    async fn after_command(&self, driver: &dyn PageDriver) {
        self.poll(driver, self.command_timeout_ms).await;
    }
}
