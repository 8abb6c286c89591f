//! Error types for due-sort.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors talking to the task board.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("Request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    #[error("Failed to build board client: {0}")]
    Client(String),
}

/// Run-level reconciliation failures. Per-card problems never surface here.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Failed to list cards: {0}")]
    ListCards(#[source] BoardError),

    #[error("A reconciliation run is already in progress")]
    AlreadyRunning,
}
