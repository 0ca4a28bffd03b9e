use std::fmt::Display;

#[derive(Debug, thiserror::Error)]
pub enum EtlError {
    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Aggregation error: {0}")]
    Aggregation(String),

    #[error("Load error: {0}")]
    Load(String),

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl EtlError {
    pub fn credential(err: impl Display) -> Self {
        EtlError::Credential(err.to_string())
    }

    pub fn extraction(err: impl Display) -> Self {
        EtlError::Extraction(err.to_string())
    }

    pub fn load(err: impl Display) -> Self {
        EtlError::Load(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
