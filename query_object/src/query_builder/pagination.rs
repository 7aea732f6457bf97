//! Pagination window
//!
//! `skip` rows are dropped first, then at most `limit` rows are kept.

use crate::errors::{QueryError, QueryResult};
use serde_json::Value;

/// Pagination configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub limit: Option<u64>,
    pub skip: u64,
}

impl Pagination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    /// Slice `[skip, skip + limit)`, or `[skip, end)` without a limit
    pub fn apply<T>(&self, rows: Vec<T>) -> Vec<T> {
        let skip = usize::try_from(self.skip).unwrap_or(usize::MAX);
        let rows = rows.into_iter().skip(skip);
        match self.limit {
            Some(limit) => rows
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .collect(),
            None => rows.collect(),
        }
    }
}

/// Validate a limit; `None` means unbounded
pub fn check_limit(limit: Option<u64>) -> QueryResult<Option<u64>> {
    match limit {
        Some(0) => Err(QueryError::invalid_type(
            "limit must be a positive number",
            "0",
        )),
        other => Ok(other),
    }
}

/// Coerce a plain limit value; numeric strings are accepted
pub fn parse_limit(value: &Value) -> QueryResult<Option<u64>> {
    if value.is_null() {
        return Ok(None);
    }
    let limit = coerce_count(value, "limit")?;
    check_limit(Some(limit))
}

/// Coerce a plain skip value; `null` resets to 0
pub fn parse_skip(value: &Value) -> QueryResult<u64> {
    if value.is_null() {
        return Ok(0);
    }
    coerce_count(value, "skip")
}

fn coerce_count(value: &Value, name: &str) -> QueryResult<u64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| QueryError::invalid_type(format!("{} must be a number", name), value.to_string()))?;

    if !number.is_finite() || number < 0.0 || number.fract() != 0.0 {
        return Err(QueryError::invalid_type(
            format!("{} must be a non-negative integer", name),
            value.to_string(),
        ));
    }
    Ok(number as u64)
}
