//! Errors raised while loading or validating a resolved program

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LoadError>;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("I/O error for {path:?}: {error}")]
    Io { path: PathBuf, error: std::io::Error },

    #[error("Malformed program description: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Dangling type reference {id} in {context}")]
    DanglingType { id: u32, context: String },

    #[error("Dangling scope reference {id} in package {package}")]
    DanglingScope { id: u32, package: String },

    #[error("Invalid program: {message}")]
    Invalid { message: String },
}

impl LoadError {
    pub fn dangling_type(id: u32, context: impl Into<String>) -> Self {
        Self::DanglingType {
            id,
            context: context.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}
