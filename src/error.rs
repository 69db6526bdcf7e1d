//! Curation engine error types.
//!
//! Library modules return [`Result`] over the [`Error`] enum below, while the
//! CLI uses `anyhow` for convenient error propagation.
//!
//! # Design
//!
//! - [`Error::UnreadableImage`]: fingerprinting failed; ingestion skips the file
//! - [`Error::RecordNotFound`]: a referenced path is not in the record store
//! - [`Error::Filesystem`]: a file move failed; the operation aborts
//! - Infrastructure errors (IO, database, config) auto-convert via `From`
//!
//! Duplicate content and an empty candidate pool are *not* errors: ingestion
//! reports duplicates as an [`IngestEvent`](crate::library::IngestEvent) and
//! selection returns an empty set.
//!
//! # Example
//!
//! ```ignore
//! use pic_curator::error::{Error, Result};
//!
//! fn probe(path: &Path) -> Result<Fingerprint> {
//!     let fp = fingerprint::fingerprint(path)?; // UnreadableImage on failure
//!     Ok(fp)
//! }
//! ```

use std::path::PathBuf;

/// Engine-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level engine error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File is not a decodable image
    #[error("Unreadable image {path}: {message}")]
    UnreadableImage { path: PathBuf, message: String },

    /// Referenced path has no record
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// Relocating a file failed
    #[error("Filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an unreadable-image error.
    pub fn unreadable(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::UnreadableImage {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a record-not-found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::RecordNotFound(path.into())
    }

    /// Create a filesystem error for the given path.
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error (or the error it wraps) is an unreadable image.
    pub fn is_unreadable(&self) -> bool {
        match self {
            Self::UnreadableImage { .. } => true,
            Self::WithContext { source, .. } => source.is_unreadable(),
            _ => false,
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Database(e).context(ctx))
    }
}
