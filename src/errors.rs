//! Error types for the DocQuery crate
//!
//! Wraps query and configuration failures behind one type for callers that
//! go through [`crate::QueryEngine`].

use config::ConfigError;
use query_object::{ErrorKind, QueryError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocQueryError {
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl DocQueryError {
    /// Classification of a query failure; `None` for configuration errors
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            DocQueryError::Query(err) => Some(err.kind()),
            DocQueryError::Config(_) => None,
        }
    }
}
