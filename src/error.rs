use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumDiscriminants};
use thiserror::Error;

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq, EnumDiscriminants)]
#[strum_discriminants(name(ErrorKind))]
#[strum_discriminants(derive(AsRefStr, Hash, PartialOrd, Ord, Serialize, Deserialize))]
pub enum PermGraphError {
    #[error("malformed input: {0}")]
    Malformed(String),

    #[error("statement has no identifiable principal: {0}")]
    UnresolvedPrincipal(String),

    #[error("file not found: {0}")]
    MissingFile(String),

    #[error("I/O failure: {0}")]
    IoFailure(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("policy oracle error: {0}")]
    Oracle(String),
}

impl PermGraphError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::from(self)
    }
}

impl From<serde_json::Error> for PermGraphError {
    fn from(err: serde_json::Error) -> Self {
        PermGraphError::InvalidJson(err.to_string())
    }
}

impl From<std::io::Error> for PermGraphError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => PermGraphError::MissingFile(err.to_string()),
            _ => PermGraphError::IoFailure(err.to_string()),
        }
    }
}
