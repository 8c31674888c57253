use crate::types::ServiceKey;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing bearer token: environment variable {0} is not set")]
    MissingToken(String),

    #[error("Sheet request for {service} returned HTTP {status}")]
    Status { service: ServiceKey, status: u16 },

    #[error("Fetch task for {0} did not complete")]
    TaskAborted(ServiceKey),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
