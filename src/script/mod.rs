//! Script generation, the persisted header format, and the script store.

pub mod generator;
pub mod header;
pub mod store;

pub use header::{RecordingSummary, ScriptHeader};
pub use store::{FsScriptStore, ScriptStore};
