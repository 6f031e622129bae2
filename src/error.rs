use thiserror::Error;

#[derive(Error, Debug)]
pub enum RehearseError {
    #[error("A recording is already in progress")]
    AlreadyRecording,

    #[error("No recording is in progress")]
    NotRecording,

    #[error("A replay is already in progress")]
    AlreadyReplaying,

    #[error("Capture listener injection failed: {0}")]
    Injection(String),

    #[error("Page driver error: {0}")]
    Driver(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDeserialize(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, RehearseError>;
