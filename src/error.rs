use thiserror::Error;
use std::io;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input error: {0}")]
    Input(String),

    #[error("Substitution matrix error: {0}")]
    SubstitutionMatrix(String),

    #[error("Sequence length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("Group {key} has {size} records, above the ceiling of {limit}")]
    GroupTooLarge { key: String, size: usize, limit: usize },

    #[error("Clique enumeration for group {key} exceeded {limit} steps")]
    CliqueBudgetExceeded { key: String, limit: u64 },

    #[error("Group processing failed: {0}")]
    GroupProcessing(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

// Type alias for Result
pub type Result<T> = std::result::Result<T, Error>;

// Helper functions for common error conversions
impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn input<S: Into<String>>(msg: S) -> Self {
        Error::Input(msg.into())
    }

    pub fn matrix<S: Into<String>>(msg: S) -> Self {
        Error::SubstitutionMatrix(msg.into())
    }

    pub fn group<S: Into<String>>(msg: S) -> Self {
        Error::GroupProcessing(msg.into())
    }
}

impl From<rayon::ThreadPoolBuildError> for Error {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        Error::ThreadPool(format!("Thread pool build failed: {}", err))
    }
}
