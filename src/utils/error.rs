//! Error types for visual-edits

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for visual-edits operations
#[derive(Debug, Error)]
pub enum VisualEditsError {
    /// Source tagging failed
    #[error("Tagger error: {0}")]
    Tagger(#[from] TaggerError),
    /// Persisted state could not be read or written
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    /// Inbound protocol payload could not be decoded
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    /// Document loading errors
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),
    /// Configuration file errors
    #[error("Config error in {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Tagger-specific errors
#[derive(Debug, Error)]
pub enum TaggerError {
    /// The source could not be parsed; no output is produced for the file
    #[error("{file}:{line}:{column}: {message}")]
    Parse {
        file: String,
        line: usize,
        column: usize,
        message: String,
    },
}

/// Storage-specific errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backing file could not be accessed
    #[error("storage file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Backing file holds invalid JSON
    #[error("storage encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Protocol-specific errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Payload is not valid JSON
    #[error("invalid message payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Document-specific errors
#[derive(Debug, Error)]
pub enum DocumentError {
    /// HTML could not be read
    #[error("HTML parse failed: {0}")]
    HtmlParse(String),
}

/// Convenience Result type for visual-edits operations
pub type Result<T> = std::result::Result<T, VisualEditsError>;
