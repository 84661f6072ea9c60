use std::{path::PathBuf, time::Duration};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UsageError {
    #[error("Failed to read decision store {path}: {reason}")]
    StoreRead { path: PathBuf, reason: String },

    #[error("Failed to write decision store {path}: {reason}")]
    StoreWrite { path: PathBuf, reason: String },

    #[error("No config directory available to place the decision store")]
    NoConfigDir,

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("No sink configured: set `collector_url` or provide a sink")]
    MissingSink,

    #[error("Delivery task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, UsageError>;

/// Failure reported by a [`Sink`](crate::sink::Sink) while transmitting one event.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Sink is not connected")]
    Disconnected,

    #[error("Send timed out after {0:?}")]
    Timeout(Duration),

    #[error("Collector rejected event: HTTP {status}")]
    Rejected { status: u16 },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
#[error("Failed to encode event {sequence}: {reason}")]
pub struct EncodeError {
    pub sequence: u64,
    pub reason: String,
}
