//! Error types for harbormaster operations.

use thiserror::Error;

/// Main error type for harbormaster operations
#[derive(Error, Debug)]
pub enum HarborError {
    /// The coordination port is already bound by another coordinator process
    #[error("another port coordination server is already running on port {0}")]
    CoordinatorRunning(u16),

    /// The same coordinator object was started twice in one process
    #[error("port coordination server already started in this process")]
    AlreadyStarted,

    /// No port assignment exists for an instance id
    #[error("no port assigned to instance '{0}'")]
    InstanceNotFound(String),

    /// Assignment requested for an instance that already holds a port
    #[error("instance '{instance}' already has port {port} assigned")]
    PortConflict { instance: String, port: u16 },

    /// Explicitly requested port outside the valid range
    #[error("port {0} is outside the valid range 1024-65535")]
    PortOutOfRange(u32),

    /// Duplicate account name found in config
    #[error("duplicate account name: {0}")]
    DuplicateAccount(String),

    /// No account with the given name exists in config
    #[error("no account named '{0}' in config")]
    AccountNotFound(String),

    /// Invalid configuration for a named account
    #[error("invalid config for account '{0}': {1}")]
    InvalidAccount(String, String),

    /// Config file could not be read, written, or parsed
    #[error("config error: {0}")]
    Config(String),

    /// Remote API returned a non-success status
    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    /// Transport-level HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Underlying I/O failure (socket bind, port detection, file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for harbormaster operations
pub type Result<T> = std::result::Result<T, HarborError>;
