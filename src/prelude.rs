//! Convenience re-exports for common DocQuery usage
//!
//! # Example
//!
//! ```rust
//! use docquery::prelude::*;
//!
//! let query = Query::new().equal_to("name", "Ann");
//! assert_eq!(query.filter_value(), json!({ "name": "Ann" }));
//! ```

// Core DocQuery components
pub use crate::core::QueryEngine;
pub use crate::errors::DocQueryError;

// Re-export centralized config
pub use config::{AppConfig, ConfigError, ProcessorConfig};

// Re-export commonly used query types
pub use query_object::prelude::*;
