use thiserror::Error;

use crate::domain::DomainError;

/// Failures reading or writing workbooks and configuration on disk.
#[derive(Debug, Error)]
pub enum InfrastructureError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid workbook file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

pub type InfrastructureResult<T> = Result<T, InfrastructureError>;
