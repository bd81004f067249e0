pub mod auth;
pub mod backlog;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod expenses;
pub mod ideas;
pub mod local_store;
pub mod manager;
pub mod models;
pub mod postgrest;
pub mod remote;
pub mod server;
pub mod utils;

// Re-export types at crate root for convenient importing
pub use crate::auth::{AuthManager, IdentityProvider, Session};
pub use crate::backlog::BacklogManager;
pub use crate::database::Db;
pub use crate::error::{PmsError, Result};
pub use crate::expenses::ExpenseTracker;
pub use crate::ideas::IdeasManager;
pub use crate::local_store::LocalTables;
pub use crate::manager::{LoadingState, ManagerState};
pub use crate::postgrest::PostgrestClient;
pub use crate::remote::{Filter, Order, RemoteTable, TableQuery};

/// State shared across the local backend's request handlers
#[derive(Clone)]
pub struct AppState {
    pub store: LocalTables,
    /// Required `apikey` header value, if any
    pub api_key: Option<String>,
}
