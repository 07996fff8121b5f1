//! Error types for segue-core.

use thiserror::Error;

/// Error type for segue-core operations.
///
/// The dispatch path itself never errors: invalid events are dropped by
/// sanitize and switches to unknown scenes are silent no-ops. Errors here
/// come from construction and backend startup.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Backend: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
