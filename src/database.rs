use anyhow::Result;
use libsql::{Builder, Connection};
use std::{path::Path, sync::Arc};
use tokio::sync::RwLock;

const CREATE_TABLE_ROWS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS table_rows (
    table_name  TEXT    NOT NULL,
    id          TEXT    NOT NULL,
    body        TEXT    NOT NULL,
    PRIMARY KEY (table_name, id)
);
"#;

const CREATE_TABLE_ROWS_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_table_rows_table ON table_rows(table_name);
"#;

pub type Db = Arc<RwLock<Connection>>;

async fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute(CREATE_TABLE_ROWS_TABLE, ()).await?;
    conn.execute(CREATE_TABLE_ROWS_INDEX, ()).await?;
    Ok(())
}

/// Row store backing the local table backend (tables.db)
pub async fn init_store_db(data_dir: &str) -> Result<Db> {
    tokio::fs::create_dir_all(data_dir).await?;
    let path = Path::new(data_dir).join("tables.db");
    let db = Builder::new_local(path).build().await?;
    let conn = db.connect()?;

    apply_schema(&conn).await?;
    Ok(Arc::new(RwLock::new(conn)))
}
