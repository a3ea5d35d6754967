//! Signing workflow errors
//!
//! Failures from the manifest reader, the XPI builder and the signing
//! client are wrapped transparently so their message reaches the user
//! unchanged.

use miette::Diagnostic;
use thiserror::Error;
use xpisign_amo::AmoError;
use xpisign_core::CoreError;

#[derive(Error, Debug, Diagnostic)]
pub enum SignError {
    /// Required credentials are absent. Already reported flag by flag.
    #[error("Missing required option(s): {}", flags.join(", "))]
    #[diagnostic(code(xpisign::sign::missing_credentials))]
    MissingCredentials { flags: Vec<&'static str> },

    /// The parsed command line is not usable
    #[error("Invalid arguments: {message}")]
    #[diagnostic(code(xpisign::sign::usage))]
    InvalidProgram {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Cannot derive an add-on id from the manifest")]
    #[diagnostic(
        code(xpisign::sign::missing_id),
        help(
            "Set `id` in package.json or `browser_specific_settings.gecko.id` in manifest.json"
        )
    )]
    MissingId,

    #[error("Invalid configuration file {path}: {message}")]
    #[diagnostic(code(xpisign::config))]
    Config { path: String, message: String },

    #[error(transparent)]
    #[diagnostic(code(xpisign::core))]
    Core(#[from] CoreError),

    #[error(transparent)]
    #[diagnostic(code(xpisign::amo))]
    Amo(#[from] AmoError),

    #[error(transparent)]
    #[diagnostic(code(xpisign::io))]
    Io(#[from] std::io::Error),
}

impl SignError {
    pub fn invalid_program(message: impl Into<String>) -> Self {
        Self::InvalidProgram {
            message: message.into(),
            help: None,
        }
    }

    pub fn invalid_program_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::InvalidProgram {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Whether a diagnostic report should be printed for this error
    ///
    /// Missing credentials were already reported line by line.
    pub fn has_report(&self) -> bool {
        !matches!(self, Self::MissingCredentials { .. })
    }
}

pub type Result<T> = std::result::Result<T, SignError>;
