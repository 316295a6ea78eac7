//! Error taxonomy shared by the sync and query pipelines.
//!
//! Library code returns [`Result`]; the binary converts into `anyhow` at the
//! top level. [`Error::is_fatal`] decides whether a failure aborts a sync
//! batch or is recorded against a single document.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid configuration. Raised before any side effect.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to import {file}: {reason}")]
    Import { file: String, reason: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("failed to write state file {}: {source}", path.display())]
    StateWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("knowledge base error: {0}")]
    KnowledgeBase(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    /// Fatal errors abort a sync batch. Everything else is scoped to one document.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Configuration(_) => true,
            Error::StateWrite { source, .. } => source.kind() == io::ErrorKind::PermissionDenied,
            _ => false,
        }
    }
}

/// Failure reported by a generation provider or remote knowledge base.
#[derive(Debug, Error)]
#[error("{message}{}", status_suffix(.status, .body))]
pub struct ProviderError {
    pub status: Option<u16>,
    pub body: Option<String>,
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            body: None,
            message: message.into(),
        }
    }

    pub fn with_status(message: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            body: Some(body.into()),
            message: message.into(),
        }
    }
}

fn status_suffix(status: &Option<u16>, body: &Option<String>) -> String {
    match (status, body) {
        (Some(status), Some(body)) if !body.is_empty() => format!(" ({status}): {body}"),
        (Some(status), _) => format!(" ({status})"),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_is_fatal() {
        assert!(Error::config("bad").is_fatal());
    }

    #[test]
    fn state_write_fatal_only_on_permission_denied() {
        let denied = Error::StateWrite {
            path: PathBuf::from("cursor.txt"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        let busy = Error::StateWrite {
            path: PathBuf::from("cursor.txt"),
            source: io::Error::new(io::ErrorKind::Other, "busy"),
        };
        assert!(denied.is_fatal());
        assert!(!busy.is_fatal());
    }

    #[test]
    fn import_and_provider_are_not_fatal() {
        let import = Error::Import {
            file: "a.pdf".into(),
            reason: "corrupt".into(),
        };
        assert!(!import.is_fatal());
        assert!(!Error::from(ProviderError::new("down")).is_fatal());
    }

    #[test]
    fn provider_error_message_includes_status_and_body() {
        let err = ProviderError::with_status("local provider returned an error", 500, "boom");
        assert_eq!(err.to_string(), "local provider returned an error (500): boom");
        let err = ProviderError::new("hosted provider requires an API token");
        assert_eq!(err.to_string(), "hosted provider requires an API token");
    }
}
