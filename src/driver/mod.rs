//! Page-execution capability consumed by the recorder and the replayer.

pub mod cdp;

use crate::error::Result;
use async_trait::async_trait;

pub use cdp::CdpDriver;

/// Everything the core needs from the host's page/tab abstraction.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Evaluate JavaScript in the page and return its JSON value.
    async fn run_script(&self, code: &str) -> Result<serde_json::Value>;

    /// Load a URL into the page.
    async fn load_url(&self, url: &str) -> Result<()>;

    /// The page's current URL.
    async fn current_url(&self) -> Result<String>;

    /// Capture the current page as a base64-encoded PNG.
    async fn capture_page(&self) -> Result<String>;
}

/// Post-replay session persistence, owned by an external session manager.
#[async_trait]
pub trait SessionSaver: Send + Sync {
    async fn save_session(&self, domain: &str) -> Result<()>;
}
