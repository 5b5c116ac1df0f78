//! Shared utilities and error types

pub mod error;

pub use error::{
    DocumentError, ProtocolError, Result, StorageError, TaggerError, VisualEditsError,
};
