//! Unified error handling for layerbake
//!
//! Errors raised while loading and validating the host scene. The export
//! pipeline reports its failures through its own error types.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for scene operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Scene description is not valid JSON for the scene schema
    #[error("Scene description error: {0}")]
    Json(#[from] serde_json::Error),

    /// Source image could not be decoded
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Scene description parsed but is not usable
    #[error("Invalid scene data: {message}")]
    InvalidData { message: String },

    /// A scene entry references something that does not exist
    #[error("Unresolved reference: {reference}")]
    InvalidReference { reference: String },

    /// Error annotated with what was being loaded
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

/// Result type using the unified Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an error with additional context
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create an invalid data error
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Error::InvalidData {
            message: message.into(),
        }
    }

    /// Create an unresolved reference error
    pub fn invalid_reference(reference: impl Into<String>) -> Self {
        Error::InvalidReference {
            reference: reference.into(),
        }
    }

    /// Check if this is a "not found" type error
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::FileNotFound(_) | Error::InvalidReference { .. } => true,
            Error::WithContext { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Check if this is a decode/format error
    pub fn is_parse_error(&self) -> bool {
        match self {
            Error::Json(_) | Error::Image(_) | Error::InvalidData { .. } => true,
            Error::WithContext { source, .. } => source.is_parse_error(),
            _ => false,
        }
    }
}

/// Attach loading context to scene results
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Like [`ResultExt::context`], building the message only on error
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
