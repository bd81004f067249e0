#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use my_pms::{
    AppState, AuthManager, Filter, LocalTables, PmsError, RemoteTable, Session, TableQuery,
    database, server,
};
use serde_json::Value;
use tokio::sync::Notify;

pub const TEST_USER_ID: &str = "8f14e45f-ceea-467f-a0e6-7a1d3b9c1e55";

pub struct TestStore {
    pub tables: LocalTables,
    pub auth: Arc<AuthManager>,
    _dir: tempfile::TempDir,
}

impl TestStore {
    pub fn remote(&self) -> Arc<dyn RemoteTable> {
        Arc::new(self.tables.clone())
    }

    pub fn app_state(&self, api_key: Option<&str>) -> AppState {
        AppState {
            store: self.tables.clone(),
            api_key: api_key.map(str::to_string),
        }
    }
}

pub async fn setup_store() -> anyhow::Result<TestStore> {
    let dir = tempfile::tempdir()?;
    let data_path = dir.path().to_string_lossy().to_string();

    let db = database::init_store_db(&data_path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize table store: {}", e))?;

    let auth = Arc::new(AuthManager::with_session(Session::new(
        TEST_USER_ID,
        make_access_token(TEST_USER_ID),
    )));

    Ok(TestStore {
        tables: LocalTables::new(db),
        auth,
        _dir: dir,
    })
}

/// Unsigned JWT carrying only a `sub` claim.
pub fn make_access_token(sub: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::json!({ "sub": sub, "role": "authenticated" }).to_string());
    format!("{}.{}.signature", header, payload)
}

/// Serves the local backend on an ephemeral port and returns its base URL.
pub async fn spawn_backend(state: AppState) -> anyhow::Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?;
    let app = server::router(state);

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(format!("http://{}", address))
}

/// Fails every call with the given message and counts how many calls were made.
pub struct FailingTable {
    pub message: String,
    pub calls: AtomicUsize,
}

impl FailingTable {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> my_pms::Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(PmsError::Remote(self.message.clone()))
    }
}

#[async_trait]
impl RemoteTable for FailingTable {
    async fn select(&self, _table: &str, _query: &TableQuery) -> my_pms::Result<Vec<Value>> {
        self.fail()
    }

    async fn insert(&self, _table: &str, _row: Value) -> my_pms::Result<()> {
        self.fail()
    }

    async fn update(&self, _table: &str, _fields: Value, _filters: &[Filter]) -> my_pms::Result<()> {
        self.fail()
    }

    async fn delete(&self, _table: &str, _filters: &[Filter]) -> my_pms::Result<()> {
        self.fail()
    }
}

/// Delegates to a real store but lets selects and writes be failed on demand.
pub struct FlakyTable {
    pub inner: LocalTables,
    pub fail_selects: std::sync::atomic::AtomicBool,
    pub fail_deletes: std::sync::atomic::AtomicBool,
}

impl FlakyTable {
    pub fn new(inner: LocalTables) -> Self {
        Self {
            inner,
            fail_selects: Default::default(),
            fail_deletes: Default::default(),
        }
    }
}

#[async_trait]
impl RemoteTable for FlakyTable {
    async fn select(&self, table: &str, query: &TableQuery) -> my_pms::Result<Vec<Value>> {
        if self.fail_selects.load(Ordering::SeqCst) {
            return Err(PmsError::Remote("connection reset".to_string()));
        }
        self.inner.select(table, query).await
    }

    async fn insert(&self, table: &str, row: Value) -> my_pms::Result<()> {
        self.inner.insert(table, row).await
    }

    async fn update(&self, table: &str, fields: Value, filters: &[Filter]) -> my_pms::Result<()> {
        self.inner.update(table, fields, filters).await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> my_pms::Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(PmsError::Remote("permission denied for table".to_string()));
        }
        self.inner.delete(table, filters).await
    }
}

/// Holds every select until released, so in-flight state can be observed.
pub struct GatedTable {
    pub release: Notify,
    pub rows: Vec<Value>,
}

#[async_trait]
impl RemoteTable for GatedTable {
    async fn select(&self, _table: &str, _query: &TableQuery) -> my_pms::Result<Vec<Value>> {
        self.release.notified().await;
        Ok(self.rows.clone())
    }

    async fn insert(&self, _table: &str, _row: Value) -> my_pms::Result<()> {
        Ok(())
    }

    async fn update(&self, _table: &str, _fields: Value, _filters: &[Filter]) -> my_pms::Result<()> {
        Ok(())
    }

    async fn delete(&self, _table: &str, _filters: &[Filter]) -> my_pms::Result<()> {
        Ok(())
    }
}
