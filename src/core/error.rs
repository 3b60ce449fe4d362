use thiserror::Error;

#[derive(Error, Debug)]
pub enum FleetError {
    #[error("Duplicate robot id: {0}")]
    DuplicateRobot(crate::core::types::RobotId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, FleetError>;
