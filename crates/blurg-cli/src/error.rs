use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] blurg_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No entry text provided")]
    EmptyText,
    #[error("Invalid entry id: {0}")]
    InvalidId(String),
    #[error("Configuration error: {0}")]
    Config(String),
}
