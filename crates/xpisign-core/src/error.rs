//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Add-on directory not found: {path}")]
    AddonNotFound { path: String },

    #[error("No package.json or manifest.json found in {path}")]
    ManifestNotFound { path: String },

    #[error("Failed to parse manifest: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid XPI archive: {message}")]
    Archive { message: String },

    #[error("Invalid ignore pattern '{pattern}': {message}")]
    IgnorePattern { pattern: String, message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },
}

impl From<zip::result::ZipError> for CoreError {
    fn from(e: zip::result::ZipError) -> Self {
        match e {
            zip::result::ZipError::Io(io) => CoreError::Io(io),
            other => CoreError::Archive {
                message: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
