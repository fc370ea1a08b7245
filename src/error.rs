//! Error types for the meeting triage pipeline.

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Mailbox error: {0}")]
    Mailbox(#[from] MailboxError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Monitor error: {0}")]
    Monitor(#[from] MonitorError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the persisted monitor state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Identifier {id} already recorded as {existing}")]
    IdentifierConflict { id: String, existing: &'static str },

    #[error("Failed to persist state to {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load state from {path}: {message}")]
    Load { path: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Mailbox collaborator errors.
#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Transcript fetch failed for {reference}: {message}")]
    TranscriptFetch { reference: String, message: String },

    #[error("Task creation failed: {0}")]
    TaskCreation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// AI-analysis collaborator errors.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Analysis request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid analysis response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Downstream delivery errors (bot, ticket tracker).
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Bot notification failed: {0}")]
    Bot(String),

    #[error("Ticket tracker request failed: {0}")]
    Tracker(String),

    #[error("Task sync failed: {0}")]
    TaskSync(String),

    #[error("Delivery target {target} exhausted {attempts} attempts: {message}")]
    AttemptsExhausted {
        target: &'static str,
        attempts: u32,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Monitoring loop errors.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Monitoring session already active")]
    AlreadyActive,

    #[error("Cannot transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Mailbox error: {0}")]
    Mailbox(#[from] MailboxError),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
