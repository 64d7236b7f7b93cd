//! Error types for Brainstorm Dice.

use serde::Serialize;

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Push error: {0}")]
    Push(#[from] PushError),

    #[error("Negotiation error: {0}")]
    Negotiation(#[from] NegotiationError),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),
}

/// Failure classes of the launch gate, used as structured log labels.
///
/// Only `NoConnectivity` in front of a saved web decision reaches the user,
/// as a retry prompt. Every other class is recovered locally by committing
/// the main application.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GateFailure {
    PermissionDenied,
    SystemError,
    NoConnectivity,
    MalformedRequest,
    Transport,
    StoreCorruption,
}

impl GateFailure {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission_denied",
            Self::SystemError => "system_error",
            Self::NoConnectivity => "no_connectivity",
            Self::MalformedRequest => "malformed_request",
            Self::Transport => "transport",
            Self::StoreCorruption => "store_corruption",
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Failed to initialise logging: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Key-value persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to write {path}: {reason}")]
    WriteFailed { path: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}

/// Push-token provisioning errors.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PushError {
    #[error("Notification permission denied")]
    PermissionDenied,

    #[error("Remote notification registration failed: {0}")]
    SystemError(String),

    #[error("Token delivery channel closed before a token arrived")]
    NoToken,

    #[error("A token request is already pending")]
    RequestInFlight,
}

impl PushError {
    pub fn failure(&self) -> GateFailure {
        match self {
            Self::PermissionDenied => GateFailure::PermissionDenied,
            Self::SystemError(_) | Self::NoToken | Self::RequestInFlight => {
                GateFailure::SystemError
            }
        }
    }
}

/// Link negotiation errors.
///
/// Transport failures are not represented here: they are logged as
/// `transport` and collapse into "no redirect" inside the negotiator.
#[derive(Debug, thiserror::Error)]
pub enum NegotiationError {
    #[error("Malformed negotiation request for {endpoint}: {reason}")]
    MalformedRequest { endpoint: String, reason: String },

    #[error("HTTP client init failed: {0}")]
    Client(#[from] reqwest::Error),
}

impl NegotiationError {
    pub fn failure(&self) -> GateFailure {
        match self {
            Self::MalformedRequest { .. } => GateFailure::MalformedRequest,
            Self::Client(_) => GateFailure::SystemError,
        }
    }
}

/// Prompt library errors.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("Favorite {id} not found")]
    FavoriteNotFound { id: uuid::Uuid },

    #[error("Invalid challenge duration list: {reason}")]
    InvalidDurations { reason: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
