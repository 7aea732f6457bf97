//! Query state
//!
//! A [`Query`] is a cheap handle onto a shared node. Builder calls mutate the
//! node in place and hand back a handle, so chained calls and later reads see
//! the same state. Sub-queries created by joins link back to their parent
//! without owning it; `fields`, `sort`, `limit` and `skip` always live on the
//! root of that graph while each node keeps its own filter.

use crate::errors::{QueryError, QueryResult};
use crate::query_builder::filter::{FilterTree, SharedFilter};
use crate::query_builder::ordering::{SortKeys, SortOrder};
use crate::query_builder::pagination::{self, Pagination};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

#[derive(Debug, Default)]
pub(crate) struct QueryNode {
    pub(crate) filter: SharedFilter,
    pub(crate) fields: Vec<String>,
    pub(crate) sort: SortKeys,
    pub(crate) pagination: Pagination,
    pub(crate) parent: Option<Weak<RefCell<QueryNode>>>,
}

/// Fluent query description, evaluable locally or serializable for a remote store
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub(crate) node: Rc<RefCell<QueryNode>>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a query from `{fields, filter, sort, limit, skip}`; every key is optional
    pub fn from_plain_object(options: &Value) -> QueryResult<Self> {
        let options = match options {
            Value::Null => return Ok(Self::new()),
            Value::Object(options) => options,
            other => {
                return Err(QueryError::invalid_type(
                    "query options must be an object",
                    other.to_string(),
                ))
            }
        };

        let query = Self::new();
        if let Some(fields) = options.get("fields") {
            query.set_fields_value(fields)?;
        }
        if let Some(filter) = options.get("filter") {
            let tree = match filter {
                Value::Null => FilterTree::new(),
                filter => FilterTree::from_value(filter)?,
            };
            *query.shared_filter().borrow_mut() = tree;
        }
        if let Some(sort) = options.get("sort") {
            query.set_sort_value(sort)?;
        }
        if let Some(limit) = options.get("limit") {
            query.set_limit_value(limit)?;
        }
        if let Some(skip) = options.get("skip") {
            query.set_skip_value(skip)?;
        }
        Ok(query)
    }

    pub(crate) fn child_of(parent: &Query) -> Self {
        let child = Self::new();
        child.node.borrow_mut().parent = Some(Rc::downgrade(&parent.node));
        child
    }

    /// Live parent, if this query was produced by a join
    pub fn parent(&self) -> Option<Query> {
        let parent = self.node.borrow().parent.as_ref().and_then(Weak::upgrade);
        parent.map(|node| Query { node })
    }

    pub fn has_parent(&self) -> bool {
        self.parent().is_some()
    }

    /// Outermost live ancestor; the query itself when it has no parent
    pub fn root(&self) -> Query {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// Whether both handles point at the same node
    pub fn ptr_eq(&self, other: &Query) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }

    pub(crate) fn shared_filter(&self) -> SharedFilter {
        Rc::clone(&self.node.borrow().filter)
    }

    pub(crate) fn update_filter(&self, update: impl FnOnce(&mut FilterTree)) -> Query {
        {
            let node = self.node.borrow();
            let mut filter = node.filter.borrow_mut();
            update(&mut *filter);
        }
        self.clone()
    }

    fn update_root(&self, update: impl FnOnce(&mut QueryNode)) -> Query {
        let root = self.root();
        {
            let mut node = root.node.borrow_mut();
            update(&mut *node);
        }
        self.clone()
    }

    fn read_root<R>(&self, read: impl FnOnce(&QueryNode) -> R) -> R {
        let root = self.root();
        let node = root.node.borrow();
        let value = read(&*node);
        value
    }

    /// Snapshot of this node's own filter
    pub fn filter(&self) -> FilterTree {
        let filter = self.shared_filter();
        let snapshot = filter.borrow().deep_clone();
        snapshot
    }

    pub fn filter_value(&self) -> Value {
        let filter = self.shared_filter();
        let value = filter.borrow().to_value();
        value
    }

    pub fn fields(&self) -> Vec<String> {
        self.read_root(|node| node.fields.clone())
    }

    pub fn sort(&self) -> SortKeys {
        self.read_root(|node| node.sort.clone())
    }

    pub fn limit(&self) -> Option<u64> {
        self.read_root(|node| node.pagination.limit)
    }

    pub fn skip(&self) -> u64 {
        self.read_root(|node| node.pagination.skip)
    }

    pub fn pagination(&self) -> Pagination {
        self.read_root(|node| node.pagination)
    }

    /// Set the projection allow-list; an empty list disables projection
    pub fn set_fields<I, S>(&self, fields: I) -> Query
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        self.update_root(|node| node.fields = fields)
    }

    pub fn set_fields_value(&self, fields: &Value) -> QueryResult<Query> {
        let fields = match fields {
            Value::Null => Vec::new(),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        QueryError::invalid_type("fields must contain strings", item.to_string())
                    })
                })
                .collect::<QueryResult<Vec<_>>>()?,
            other => {
                return Err(QueryError::invalid_type(
                    "fields must be an array",
                    other.to_string(),
                ))
            }
        };
        Ok(self.set_fields(fields))
    }

    pub fn set_sort(&self, sort: SortKeys) -> Query {
        self.update_root(|node| node.sort = sort)
    }

    pub fn set_sort_value(&self, sort: &Value) -> QueryResult<Query> {
        let sort = SortKeys::from_value(sort)?;
        Ok(self.set_sort(sort))
    }

    pub fn set_limit(&self, limit: Option<u64>) -> QueryResult<Query> {
        let limit = pagination::check_limit(limit)?;
        Ok(self.update_root(|node| node.pagination.limit = limit))
    }

    pub fn set_limit_value(&self, limit: &Value) -> QueryResult<Query> {
        let limit = pagination::parse_limit(limit)?;
        Ok(self.update_root(|node| node.pagination.limit = limit))
    }

    pub fn set_skip(&self, skip: u64) -> Query {
        self.update_root(|node| node.pagination.skip = skip)
    }

    pub fn set_skip_value(&self, skip: &Value) -> QueryResult<Query> {
        let skip = pagination::parse_skip(skip)?;
        Ok(self.set_skip(skip))
    }

    /// Sort ascending by `field` on the root query
    pub fn ascending(&self, field: &str) -> Query {
        self.update_root(|node| node.sort.set(field, SortOrder::Asc))
    }

    /// Sort descending by `field` on the root query
    pub fn descending(&self, field: &str) -> Query {
        self.update_root(|node| node.sort.set(field, SortOrder::Desc))
    }
}
