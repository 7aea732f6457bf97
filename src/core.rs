//! Core DocQuery functionality
//!
//! [`QueryEngine`] owns the loaded configuration and applies it whenever a
//! query is evaluated, so callers never pass processor settings by hand.

use std::collections::BTreeMap;
use std::path::Path;

use config::AppConfig;
use query_object::Query;
use serde_json::Value;

use crate::errors::DocQueryError;

/// Entry point tying queries to one validated configuration
#[derive(Debug, Clone, Default)]
pub struct QueryEngine {
    config: AppConfig,
}

impl QueryEngine {
    /// Create an engine from an explicit configuration
    pub fn new(config: AppConfig) -> Result<Self, DocQueryError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Create an engine from `DOCQUERY_CONFIG` or `./docquery.toml`
    pub fn load() -> Result<Self, DocQueryError> {
        let config = AppConfig::load()?;
        debug_log!("loaded configuration: {:?}", config);
        Ok(Self { config })
    }

    /// Create an engine from a TOML file at `path`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DocQueryError> {
        let config = AppConfig::from_file(path)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Start an empty query
    pub fn query(&self) -> Query {
        Query::new()
    }

    /// Rebuild a query from its plain `{fields, filter, sort, limit, skip}` form
    pub fn query_from(&self, options: &Value) -> Result<Query, DocQueryError> {
        Ok(Query::from_plain_object(options)?)
    }

    /// Evaluate `query` against in-memory records using the engine's settings
    pub fn process(&self, query: &Query, records: &[Value]) -> Result<Vec<Value>, DocQueryError> {
        let result = query.process_with(records, &self.config.processor)?;
        debug_log!("engine processed {} records into {}", records.len(), result.len());
        Ok(result)
    }

    /// Evaluate `query` against a dynamically typed input, which must be an array
    pub fn process_value(&self, query: &Query, records: &Value) -> Result<Vec<Value>, DocQueryError> {
        let records = records.as_array().ok_or_else(|| {
            query_object::QueryError::missing_required(
                "records must be an array",
                records.to_string(),
            )
        })?;
        self.process(query, records)
    }

    /// Parameters a transport merges into a remote request
    pub fn query_string(&self, query: &Query) -> BTreeMap<String, String> {
        query.to_query_string()
    }
}
