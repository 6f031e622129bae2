//! Capture lifecycle: action log data model and the recorder state machine.

pub mod inject;
pub mod recorder;
pub mod schema;

pub use recorder::{Recorder, RecorderState};
pub use schema::{ActionKind, RecordedAction, Recording, RecordingMetadata};
