//! Error types for ambiance

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("Container not found: {0}")]
    ContainerNotFound(u64),
    #[error("Track not found: {0}")]
    TrackNotFound(String),
    #[error("Invalid channel profile: {0}")]
    InvalidChannelProfile(String),
    #[error("Unknown value for {field}: {value}")]
    UnknownValue { field: &'static str, value: String },
    #[error("Host error: {0}")]
    Host(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RoutingError>;
