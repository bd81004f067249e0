use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use uuid::Uuid;

use crate::constants::{CREATED_AT_COLUMN, ID_COLUMN};
use crate::error::{PmsError, Result};
use crate::remote::{Filter, Order, RemoteTable, TableQuery};

/// A row type stored in one remote table.
pub trait TableRecord: DeserializeOwned + Clone + Send + Sync + 'static {
    const TABLE: &'static str;

    fn id(&self) -> Uuid;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadingState {
    Idle,
    Loading,
    Error(String),
}

/// Published state of one manager.
#[derive(Debug, Clone)]
pub struct ManagerState<T> {
    /// Newest first, as returned by the remote sort
    pub records: Vec<T>,
    pub is_loading: bool,
    pub last_error: Option<String>,
}

impl<T> Default for ManagerState<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            is_loading: false,
            last_error: None,
        }
    }
}

impl<T> ManagerState<T> {
    pub fn loading_state(&self) -> LoadingState {
        if self.is_loading {
            LoadingState::Loading
        } else if let Some(error) = &self.last_error {
            LoadingState::Error(error.clone())
        } else {
            LoadingState::Idle
        }
    }
}

pub(crate) fn to_row<P: Serialize>(payload: &P) -> Result<Value> {
    serde_json::to_value(payload).map_err(|e| PmsError::validation(format!("Invalid payload: {}", e)))
}

fn decode_rows<T: TableRecord>(rows: Vec<Value>) -> Result<Vec<T>> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row).map_err(|e| {
                PmsError::remote(format!("Invalid {} row: {}", T::TABLE, e))
            })
        })
        .collect()
}

/// Snapshot-owning CRUD adapter over a single remote table.
///
/// Every mutation is followed by a full refetch; the snapshot is replaced, never patched.
pub struct TableManager<T: TableRecord> {
    remote: Arc<dyn RemoteTable>,
    state: watch::Sender<ManagerState<T>>,
}

impl<T: TableRecord> TableManager<T> {
    pub fn new(remote: Arc<dyn RemoteTable>) -> Self {
        let (state, _) = watch::channel(ManagerState::default());
        Self { remote, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<ManagerState<T>> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ManagerState<T> {
        self.state.borrow().clone()
    }

    pub fn records(&self) -> Vec<T> {
        self.state.borrow().records.clone()
    }

    /// Runs `f` over the current records without cloning the snapshot.
    pub fn with_records<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.state.borrow().records)
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.borrow().last_error.clone()
    }

    /// Reloads every row, newest first. Failures are recorded in state, not returned.
    pub async fn fetch_all(&self) {
        self.state.send_modify(|state| {
            state.is_loading = true;
            state.last_error = None;
        });

        let query = TableQuery::new().order(Order::desc(CREATED_AT_COLUMN));
        let result = match self.remote.select(T::TABLE, &query).await {
            Ok(rows) => decode_rows::<T>(rows),
            Err(e) => Err(e),
        };

        match result {
            Ok(records) => {
                tracing::debug!(table = T::TABLE, count = records.len(), "fetched records");
                self.state.send_modify(|state| {
                    state.records = records;
                    state.is_loading = false;
                });
            }
            Err(e) => {
                tracing::warn!(table = T::TABLE, error = %e, "fetch failed");
                self.state.send_modify(|state| {
                    state.last_error = Some(e.to_string());
                    state.is_loading = false;
                });
            }
        }
    }

    pub async fn insert(&self, row: Value) -> Result<()> {
        self.remote.insert(T::TABLE, row).await?;
        tracing::info!(table = T::TABLE, "inserted record");
        self.fetch_all().await;
        Ok(())
    }

    pub async fn update(&self, id: Uuid, fields: Value) -> Result<()> {
        self.remote
            .update(T::TABLE, fields, &[Filter::eq(ID_COLUMN, id)])
            .await?;
        tracing::info!(table = T::TABLE, %id, "updated record");
        self.fetch_all().await;
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.remote
            .delete(T::TABLE, &[Filter::eq(ID_COLUMN, id)])
            .await?;
        tracing::info!(table = T::TABLE, %id, "deleted record");
        self.fetch_all().await;
        Ok(())
    }
}
