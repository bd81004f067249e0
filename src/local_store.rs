use std::cmp::Ordering;
use std::collections::HashSet;

use async_trait::async_trait;
use libsql::Connection;
use serde_json::{Map, Value};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::constants::ID_COLUMN;
use crate::database::Db;
use crate::error::{PmsError, Result};
use crate::remote::{Filter, Order, RemoteTable, TableQuery};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("duplicate key value violates unique constraint: {table}.id = {id}")]
    Conflict { table: String, id: String },

    #[error("{0}")]
    InvalidRow(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<libsql::Error> for StoreError {
    fn from(e: libsql::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<StoreError> for PmsError {
    fn from(e: StoreError) -> Self {
        PmsError::Remote(e.to_string())
    }
}

fn row_id(row: &Value) -> Option<String> {
    match row.get(ID_COLUMN)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn matches_filter(row: &Value, filter: &Filter) -> bool {
    match row.get(&filter.column) {
        Some(Value::String(s)) => s == &filter.value,
        // Same as SQL `col = 'null'`: a missing value never equals anything
        Some(Value::Null) | None => false,
        Some(other) => other.to_string() == filter.value,
    }
}

fn matches_all(row: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|f| matches_filter(row, f))
}

fn parse_timestamp(value: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(value, &Rfc3339).ok()
}

/// Timestamps compare chronologically, numbers numerically, nulls first.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::String(x), Value::String(y)) => match (parse_timestamp(x), parse_timestamp(y)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x.cmp(y),
        },
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn sort_rows(rows: &mut [Value], order: &Order) {
    rows.sort_by(|a, b| {
        let a = a.get(&order.column).unwrap_or(&Value::Null);
        let b = b.get(&order.column).unwrap_or(&Value::Null);
        let ordering = compare_values(a, b);
        if order.ascending {
            ordering
        } else {
            ordering.reverse()
        }
    });
}

fn require_filters(filters: &[Filter], operation: &str) -> std::result::Result<(), StoreError> {
    if filters.is_empty() {
        return Err(StoreError::InvalidRow(format!(
            "{} requires at least one filter",
            operation
        )));
    }
    Ok(())
}

async fn load_rows(conn: &Connection, table: &str) -> std::result::Result<Vec<Value>, StoreError> {
    let mut rows = conn
        .query("SELECT body FROM table_rows WHERE table_name = ?", [table])
        .await?;

    let mut bodies = Vec::new();
    while let Some(row) = rows.next().await? {
        let body: String = row.get(0)?;
        let value = serde_json::from_str(&body)
            .map_err(|e| StoreError::Database(format!("corrupt row in {}: {}", table, e)))?;
        bodies.push(value);
    }
    Ok(bodies)
}

type Statement = (&'static str, Vec<libsql::Value>);

fn text(value: impl Into<String>) -> libsql::Value {
    libsql::Value::Text(value.into())
}

/// Runs `statements` inside one transaction on a connection the caller holds exclusively.
async fn in_transaction(
    conn: &Connection,
    statements: Vec<Statement>,
) -> std::result::Result<usize, StoreError> {
    conn.execute("BEGIN TRANSACTION", ()).await?;
    let mut changed = 0;
    for (sql, params) in statements {
        match conn.execute(sql, params).await {
            Ok(count) => changed += count as usize,
            Err(e) => {
                let _ = conn.execute("ROLLBACK", ()).await;
                return Err(e.into());
            }
        }
    }
    if let Err(e) = conn.execute("COMMIT", ()).await {
        let _ = conn.execute("ROLLBACK", ()).await;
        return Err(e.into());
    }
    Ok(changed)
}

/// JSON row store on libsql speaking the same table dialect as the hosted backend.
#[derive(Clone)]
pub struct LocalTables {
    db: Db,
}

impl LocalTables {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn select_rows(
        &self,
        table: &str,
        query: &TableQuery,
    ) -> std::result::Result<Vec<Value>, StoreError> {
        let conn = self.db.read().await;
        let mut rows: Vec<Value> = load_rows(&conn, table)
            .await?
            .into_iter()
            .filter(|row| matches_all(row, &query.filters))
            .collect();

        if let Some(order) = &query.order {
            sort_rows(&mut rows, order);
        }
        Ok(rows)
    }

    pub async fn insert_rows(
        &self,
        table: &str,
        rows: Vec<Value>,
    ) -> std::result::Result<usize, StoreError> {
        let mut seen = HashSet::new();
        let mut prepared = Vec::with_capacity(rows.len());
        for row in rows {
            if !row.is_object() {
                return Err(StoreError::InvalidRow("Row must be a JSON object".to_string()));
            }
            let id = row_id(&row)
                .ok_or_else(|| StoreError::InvalidRow("Row must carry a non-empty id".to_string()))?;
            if !seen.insert(id.clone()) {
                return Err(StoreError::Conflict {
                    table: table.to_string(),
                    id,
                });
            }
            prepared.push((id, row.to_string()));
        }

        let conn = self.db.write().await;
        for (id, _) in &prepared {
            let mut existing = conn
                .query(
                    "SELECT id FROM table_rows WHERE table_name = ? AND id = ?",
                    (table, id.as_str()),
                )
                .await?;
            if existing.next().await?.is_some() {
                return Err(StoreError::Conflict {
                    table: table.to_string(),
                    id: id.clone(),
                });
            }
        }

        let statements: Vec<Statement> = prepared
            .into_iter()
            .map(|(id, body)| {
                (
                    "INSERT INTO table_rows (table_name, id, body) VALUES (?, ?, ?)",
                    vec![text(table), text(id), text(body)],
                )
            })
            .collect();
        in_transaction(&conn, statements).await
    }

    /// Merges `fields` into every matching row; returns how many rows changed.
    pub async fn update_rows(
        &self,
        table: &str,
        fields: Value,
        filters: &[Filter],
    ) -> std::result::Result<usize, StoreError> {
        require_filters(filters, "UPDATE")?;
        let fields: Map<String, Value> = match fields {
            Value::Object(map) => map,
            _ => {
                return Err(StoreError::InvalidRow(
                    "Update fields must be a JSON object".to_string(),
                ));
            }
        };
        if fields.contains_key(ID_COLUMN) {
            return Err(StoreError::InvalidRow("Row id cannot be changed".to_string()));
        }

        // Read and write under one guard so concurrent merges see each other
        let conn = self.db.write().await;
        let mut statements: Vec<Statement> = Vec::new();
        for mut row in load_rows(&conn, table).await? {
            if !matches_all(&row, filters) {
                continue;
            }
            let Some(id) = row_id(&row) else { continue };
            if let Value::Object(existing) = &mut row {
                for (key, value) in &fields {
                    existing.insert(key.clone(), value.clone());
                }
            }
            statements.push((
                "UPDATE table_rows SET body = ? WHERE table_name = ? AND id = ?",
                vec![text(row.to_string()), text(table), text(id)],
            ));
        }
        in_transaction(&conn, statements).await
    }

    /// Removes every matching row; matching nothing is not an error.
    pub async fn delete_rows(
        &self,
        table: &str,
        filters: &[Filter],
    ) -> std::result::Result<usize, StoreError> {
        require_filters(filters, "DELETE")?;
        let conn = self.db.write().await;
        let statements: Vec<Statement> = load_rows(&conn, table)
            .await?
            .iter()
            .filter(|row| matches_all(row, filters))
            .filter_map(row_id)
            .map(|id| {
                (
                    "DELETE FROM table_rows WHERE table_name = ? AND id = ?",
                    vec![text(table), text(id)],
                )
            })
            .collect();
        in_transaction(&conn, statements).await
    }
}

#[async_trait]
impl RemoteTable for LocalTables {
    async fn select(&self, table: &str, query: &TableQuery) -> Result<Vec<Value>> {
        Ok(self.select_rows(table, query).await?)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<()> {
        self.insert_rows(table, vec![row]).await?;
        Ok(())
    }

    async fn update(&self, table: &str, fields: Value, filters: &[Filter]) -> Result<()> {
        self.update_rows(table, fields, filters).await?;
        Ok(())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<()> {
        self.delete_rows(table, filters).await?;
        Ok(())
    }
}
