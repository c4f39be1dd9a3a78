//! Error types and Result aliases for operator options.
//!
//! Every failure that can come out of option resolution is a user-input
//! error and is reported through [`OptionsError`], wrapped in the crate-wide
//! [`Error`].

use thiserror::Error;

use crate::options::Source;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for operator options.
#[derive(Error, Debug)]
pub enum Error {
    /// Option resolution or validation failed.
    #[error("invalid options: {0}")]
    Options(#[from] OptionsError),

    /// The command line could not be parsed.
    #[error("flag error: {0}")]
    Flags(#[from] clap::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors raised while turning raw flag and environment values into
/// validated options.
///
/// `field` is always the flag name, so an operator can find the knob to fix.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptionsError {
    /// A raw value did not match the grammar of its field's type.
    #[error("--{field}: cannot parse {value:?} from {origin}: {reason}")]
    MalformedLiteral {
        field: &'static str,
        origin: Source,
        value: String,
        reason: String,
    },

    /// A required field was absent from every source.
    #[error("--{field} is required (or set {env})")]
    MissingRequired {
        field: &'static str,
        env: &'static str,
    },

    /// A numeric or duration field is outside its allowed range.
    #[error("--{field}: {value} is out of range: {reason}")]
    OutOfRange {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// An endpoint is set but is not an absolute URL.
    #[error("--{field}: {value:?} is not an absolute URL: {reason}")]
    InvalidUrlShape {
        field: &'static str,
        value: String,
        reason: String,
    },
}

impl Error {
    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// The options error behind this error, if any.
    #[must_use]
    pub const fn as_options(&self) -> Option<&OptionsError> {
        match self {
            Self::Options(err) => Some(err),
            _ => None,
        }
    }
}

impl OptionsError {
    /// Flag name of the field the error is attributed to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::MalformedLiteral { field, .. }
            | Self::MissingRequired { field, .. }
            | Self::OutOfRange { field, .. }
            | Self::InvalidUrlShape { field, .. } => field,
        }
    }
}
