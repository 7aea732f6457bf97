//! Regular expression arguments for `matches`

use crate::errors::{QueryError, QueryResult};

/// Pattern accepted by [`crate::Query::matches`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// Bare pattern source without flags
    Raw(String),
    /// Pattern source plus single-letter flags such as `"mi"`
    Compiled { source: String, flags: String },
}

impl Pattern {
    pub fn regex(source: impl Into<String>, flags: impl Into<String>) -> Self {
        Pattern::Compiled {
            source: source.into(),
            flags: flags.into(),
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Pattern::Raw(source) | Pattern::Compiled { source, .. } => source,
        }
    }

    pub fn has_flag(&self, flag: char) -> bool {
        match self {
            Pattern::Raw(_) => false,
            Pattern::Compiled { flags, .. } => flags.contains(flag),
        }
    }
}

impl From<&str> for Pattern {
    fn from(source: &str) -> Self {
        Pattern::Raw(source.to_string())
    }
}

impl From<String> for Pattern {
    fn from(source: String) -> Self {
        Pattern::Raw(source)
    }
}

/// Flag overrides for `matches`; `None` defers to the pattern's own flags,
/// `Some(false)` clears a flag the pattern carries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    pub ignore_case: Option<bool>,
    pub multiline: Option<bool>,
    pub extended: Option<bool>,
    pub dot_matches_all: Option<bool>,
}

impl MatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore_case(mut self, enabled: bool) -> Self {
        self.ignore_case = Some(enabled);
        self
    }

    pub fn multiline(mut self, enabled: bool) -> Self {
        self.multiline = Some(enabled);
        self
    }

    pub fn extended(mut self, enabled: bool) -> Self {
        self.extended = Some(enabled);
        self
    }

    pub fn dot_matches_all(mut self, enabled: bool) -> Self {
        self.dot_matches_all = Some(enabled);
        self
    }
}

/// `$regex` source and `$options` letters ready for the filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedPattern {
    pub source: String,
    pub options: String,
}

pub(crate) fn resolve(pattern: &Pattern, options: &MatchOptions) -> QueryResult<ResolvedPattern> {
    if options.ignore_case.unwrap_or_else(|| pattern.has_flag('i')) {
        return Err(QueryError::invalid_argument(
            "ignoreCase flag is not supported",
            pattern.source(),
        ));
    }

    let source = pattern.source();
    if !source.starts_with('^') {
        return Err(QueryError::invalid_argument(
            "pattern must begin with '^' to be an anchored expression",
            source,
        ));
    }

    let requested = [
        ('m', options.multiline),
        ('x', options.extended),
        ('s', options.dot_matches_all),
    ];
    let options = requested
        .iter()
        .filter(|(flag, enabled)| enabled.unwrap_or_else(|| pattern.has_flag(*flag)))
        .map(|(flag, _)| *flag)
        .collect();

    Ok(ResolvedPattern {
        source: source.to_string(),
        options,
    })
}
