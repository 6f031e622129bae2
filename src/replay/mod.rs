//! Script interpretation and best-effort replay execution.

pub mod command;
pub mod executor;

pub use command::{Command, LineParser, ScriptParser};
pub use executor::{CommandOutcome, Replayer, ReplayReport, ReplayState};
