//! Database schema initialization

use sqlx::SqlitePool;

use crate::error::Result;

/// Initialize the database schema
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(SCHEMA_SQL).execute(pool).await?;

    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Catalogs (user-defined labels)
CREATE TABLE IF NOT EXISTS catalogs (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    created_at INTEGER NOT NULL,
    sort_order INTEGER
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_catalogs_name ON catalogs(name);

-- Files (metadata plus locally cached bytes)
CREATE TABLE IF NOT EXISTS files (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    url TEXT,
    data BLOB,
    catalog TEXT,
    created_at INTEGER,
    is_local INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_files_url ON files(url);
CREATE INDEX IF NOT EXISTS idx_files_catalog ON files(catalog);
"#;
