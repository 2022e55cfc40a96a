//! Error types for the Conjur CLI
//!
//! Error messages are written for the person at the terminal: each one says
//! what went wrong and, where there is one, which command fixes it.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the Conjur CLI
#[derive(Error, Debug)]
pub enum Error {
    // === Profile/Credential Errors ===
    #[error("Profile not found: run 'conjur init' first")]
    ProfileNotFound(String),

    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("Not logged in: run 'conjur login'")]
    NotLoggedIn,

    // === Service Errors ===
    #[error("Conjur returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unable to retrieve certificate from {host}: {reason}")]
    Certificate { host: String, reason: String },

    // === Interactive Errors ===
    #[error("You decided not to trust the certificate")]
    CertificateNotTrusted,

    #[error("Not overwriting {0}")]
    FileNotOverwritten(String),

    #[error("No answer given for prompt '{0}'")]
    PromptAborted(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an API error from a status code and response body
    pub fn api(status: u16, message: &str) -> Self {
        let message = message.trim();
        Self::Api {
            status,
            message: if message.is_empty() {
                "no response body".to_string()
            } else {
                message.to_string()
            },
        }
    }

    /// Create a certificate retrieval error
    pub fn certificate(host: &str, reason: impl ToString) -> Self {
        Self::Certificate {
            host: host.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a file read error
    pub fn file_read(path: &std::path::Path, error: impl ToString) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }
}
