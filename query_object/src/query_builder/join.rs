//! Boolean joins
//!
//! AND binds tightest, then NOR, then OR, whatever order the calls are made
//! in. A join without arguments returns a fresh child query whose filter is
//! the right-hand operand; filter calls on the child extend that operand while
//! sort, fields and pagination calls still reach the root.
//!
//! A child only holds a weak link to its parent. Keep a handle to the root
//! alive while extending a child: in `Query::new().exists("a").and().exists("b")`
//! the root is a temporary, so the result is a standalone query on `b` alone.

use crate::errors::{QueryError, QueryResult};
use crate::query_builder::builder::Query;
use crate::query_builder::filter::{Combinator, FilterEntry, FilterTree, SharedFilter};
use serde_json::Value;

/// Explicit right-hand operand of a join
#[derive(Debug, Clone)]
pub enum SubQuery {
    Query(Query),
    Plain(Value),
}

impl From<Query> for SubQuery {
    fn from(query: Query) -> Self {
        SubQuery::Query(query)
    }
}

impl From<&Query> for SubQuery {
    fn from(query: &Query) -> Self {
        SubQuery::Query(query.clone())
    }
}

impl From<Value> for SubQuery {
    fn from(filter: Value) -> Self {
        SubQuery::Plain(filter)
    }
}

impl SubQuery {
    /// Detached copy of the operand's filter, taken from its root
    fn into_filter(self) -> QueryResult<SharedFilter> {
        match self {
            SubQuery::Query(query) => Ok(query.root().filter().shared()),
            SubQuery::Plain(value) if value.is_object() => {
                Ok(FilterTree::from_value(&value)?.shared())
            }
            SubQuery::Plain(value) => Err(QueryError::invalid_argument(
                "query argument must be a Query or a filter object",
                value.to_string(),
            )),
        }
    }
}

fn collect_filters<I, S>(subqueries: I) -> QueryResult<Vec<SharedFilter>>
where
    I: IntoIterator<Item = S>,
    S: Into<SubQuery>,
{
    subqueries
        .into_iter()
        .map(|subquery| subquery.into().into_filter())
        .collect()
}

impl Query {
    /// Open an AND sub-query and return it
    ///
    /// The returned child does not keep `self` alive; hold on to the root.
    pub fn and(&self) -> Query {
        self.join(Combinator::And, Vec::new())
    }

    /// AND this query's current filter with `subqueries`
    pub fn and_with<I, S>(&self, subqueries: I) -> QueryResult<Query>
    where
        I: IntoIterator<Item = S>,
        S: Into<SubQuery>,
    {
        let filters = collect_filters(subqueries)?;
        Ok(self.join(Combinator::And, filters))
    }

    /// Open a NOR sub-query and return it; the caller must keep the root alive
    pub fn nor(&self) -> Query {
        self.nor_filters(Vec::new())
    }

    pub fn nor_with<I, S>(&self, subqueries: I) -> QueryResult<Query>
    where
        I: IntoIterator<Item = S>,
        S: Into<SubQuery>,
    {
        let filters = collect_filters(subqueries)?;
        Ok(self.nor_filters(filters))
    }

    /// Open an OR sub-query and return it; the caller must keep the root alive
    pub fn or(&self) -> Query {
        self.or_filters(Vec::new())
    }

    pub fn or_with<I, S>(&self, subqueries: I) -> QueryResult<Query>
    where
        I: IntoIterator<Item = S>,
        S: Into<SubQuery>,
    {
        let filters = collect_filters(subqueries)?;
        Ok(self.or_filters(filters))
    }

    fn nor_filters(&self, filters: Vec<SharedFilter>) -> Query {
        // Inside an AND sub-query the NOR must wrap the whole AND group.
        if let Some(parent) = self.parent() {
            if parent.shared_filter().borrow().has_group(Combinator::And) {
                trace_log!("nor re-targeted onto parent AND query");
                return parent.nor_filters(filters);
            }
        }
        self.join(Combinator::Nor, filters)
    }

    fn or_filters(&self, filters: Vec<SharedFilter>) -> Query {
        if let Some(parent) = self.parent() {
            trace_log!("or re-targeted onto parent query");
            return parent.or_filters(filters);
        }
        self.join(Combinator::Or, filters)
    }

    /// Replace the current filter with `{combinator: [current, ...operands]}`
    ///
    /// The filter node is rewritten in place because a parent may hold it as
    /// one of its own operands.
    fn join(&self, combinator: Combinator, filters: Vec<SharedFilter>) -> Query {
        let (target, operands) = if filters.is_empty() {
            let child = Query::child_of(self);
            let operand = child.shared_filter();
            (child, vec![operand])
        } else {
            (self.clone(), filters)
        };

        self.update_filter(|filter| {
            let left = std::mem::take(filter).shared();
            let mut group = Vec::with_capacity(operands.len() + 1);
            group.push(left);
            group.extend(operands);
            *filter = FilterTree::from_entries(vec![FilterEntry::Group {
                combinator,
                operands: group,
            }]);
        });

        trace_log!("joined filter with {}", combinator.as_str());
        target
    }
}
