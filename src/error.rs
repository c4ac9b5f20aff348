//! Error types for KhojNav

use std::time::Duration;

use thiserror::Error;

use crate::ports::GoalHandle;

/// KhojNav error type
#[derive(Error, Debug)]
pub enum KhojError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid map: {0}")]
    InvalidMap(String),

    #[error("Navigation server unavailable: {0}")]
    NavigationUnavailable(String),

    #[error("Cancel of goal {handle} not acknowledged within {timeout:?}")]
    CancelTimeout { handle: GoalHandle, timeout: Duration },

    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<toml::de::Error> for KhojError {
    fn from(e: toml::de::Error) -> Self {
        KhojError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, KhojError>;
