//! Error types for query construction and local evaluation
//!
//! Every failure is synchronous and carries a human-readable message plus a
//! machine-readable debug string.

use thiserror::Error;

/// Error classification shared with remote stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidType,
    InvalidArgument,
    MissingRequired,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidType => "invalid-type",
            ErrorKind::InvalidArgument => "invalid-argument",
            ErrorKind::MissingRequired => "missing-required",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("Invalid type: {message}")]
    InvalidType { message: String, debug: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String, debug: String },

    #[error("Missing required: {message}")]
    MissingRequired { message: String, debug: String },
}

impl QueryError {
    pub fn invalid_type(message: impl Into<String>, debug: impl Into<String>) -> Self {
        Self::InvalidType {
            message: message.into(),
            debug: debug.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>, debug: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
            debug: debug.into(),
        }
    }

    pub fn missing_required(message: impl Into<String>, debug: impl Into<String>) -> Self {
        Self::MissingRequired {
            message: message.into(),
            debug: debug.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidType { .. } => ErrorKind::InvalidType,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::MissingRequired { .. } => ErrorKind::MissingRequired,
        }
    }

    /// Human-readable description
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidType { message, .. }
            | Self::InvalidArgument { message, .. }
            | Self::MissingRequired { message, .. } => message,
        }
    }

    /// Machine-readable detail, usually the offending operator or value
    pub fn debug(&self) -> &str {
        match self {
            Self::InvalidType { debug, .. }
            | Self::InvalidArgument { debug, .. }
            | Self::MissingRequired { debug, .. } => debug,
        }
    }
}

pub type QueryResult<T> = Result<T, QueryError>;
