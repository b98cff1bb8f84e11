//! Error types for cadence-transport
//!
//! Validation and state errors are returned synchronously before any mutation.
//! Engine failures never appear here: they arrive as end-of-media events and
//! go through the loop-mode policy.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for the transport crate
#[derive(Error, Debug)]
pub enum Error {
    /// Argument outside its accepted range (seek fraction, rate, volume)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Command not valid in the current session phase or status
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Persisted item could not be resolved by the playlist
    #[error("Item not available: {0}")]
    ItemUnavailable(Uuid),

    /// Snapshot missing or inconsistent
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Snapshot payload encoding errors
    #[error("Snapshot encoding error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Configuration file loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parse errors
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Errors from shared helpers
    #[error(transparent)]
    Common(#[from] cadence_common::Error),

    /// File I/O error
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The control task is gone
    #[error("Transport service stopped")]
    ServiceStopped,
}

/// Convenience Result type using the transport Error
pub type Result<T> = std::result::Result<T, Error>;
