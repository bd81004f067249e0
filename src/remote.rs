use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Equality predicate on a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Self {
            column: column.into(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }

    /// Renders as `column.asc` / `column.desc`.
    pub fn to_param(&self) -> String {
        let direction = if self.ascending { "asc" } else { "desc" };
        format!("{}.{}", self.column, direction)
    }

    /// Parses `column`, `column.asc` or `column.desc`; trailing null-ordering modifiers are ignored.
    pub fn parse(param: &str) -> Option<Self> {
        let mut parts = param.split('.');
        let column = parts.next().filter(|c| !c.is_empty())?;
        let ascending = match parts.next() {
            None | Some("asc") => true,
            Some("desc") => false,
            Some(_) => return None,
        };
        Some(Self {
            column: column.to_string(),
            ascending,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableQuery {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

impl TableQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }
}

/// REST-style access to named relational tables holding JSON rows.
#[async_trait]
pub trait RemoteTable: Send + Sync {
    async fn select(&self, table: &str, query: &TableQuery) -> Result<Vec<Value>>;

    async fn insert(&self, table: &str, row: Value) -> Result<()>;

    async fn update(&self, table: &str, fields: Value, filters: &[Filter]) -> Result<()>;

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<()>;
}
