use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Template {0} not found")]
    NotFound(i64),

    #[error("Upload exceeds the {limit} byte limit")]
    UploadTooLarge { limit: u64 },

    #[error("Thumbnail generation failed: {0}")]
    Thumbnail(String),

    #[error("HTML rendering failed ({status}): {stderr}")]
    Render { status: String, stderr: String },

    #[error("Path {0:?} is outside the configured storage root")]
    PathOutsideRoot(PathBuf),

    #[error("Template {id} was deleted but {} artifact file(s) remain on disk: {source}", .paths.len())]
    OrphanedArtifact {
        id: i64,
        paths: Vec<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Coarse classification handed to the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    DependencyFailure,
    OrphanedArtifact,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidInput(_) | AppError::UploadTooLarge { .. } => ErrorKind::InvalidInput,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::OrphanedArtifact { .. } => ErrorKind::OrphanedArtifact,
            _ => ErrorKind::DependencyFailure,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            AppError::UploadTooLarge { .. } => 413,
            other => other.kind().status_code(),
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        AppError::InvalidInput(msg.into())
    }
}

impl ErrorKind {
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::InvalidInput => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::DependencyFailure | ErrorKind::OrphanedArtifact => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
