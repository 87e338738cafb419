//! Local cache of catalogs and files
//!
//! Each call is its own unit of work; callers never need atomicity across
//! calls.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::error::Result;
use crate::library::{Catalog, FileRecord};

/// Contract the sync orchestrator and library rely on
#[async_trait]
pub trait LocalCache: Send + Sync {
    /// All catalogs, by sort order then name
    async fn list_catalogs(&self) -> Result<Vec<Catalog>>;

    /// All files, newest first
    async fn list_files(&self) -> Result<Vec<FileRecord>>;

    async fn get_catalog(&self, id: &str) -> Result<Option<Catalog>>;

    async fn get_file(&self, id: &str) -> Result<Option<FileRecord>>;

    async fn upsert_catalog(&self, catalog: &Catalog) -> Result<()>;

    /// Insert or overwrite the file stored under `id`
    async fn upsert_file(&self, id: &str, record: &FileRecord) -> Result<()>;

    /// Clear every catalog and insert `catalogs` in one transaction
    async fn replace_catalogs(&self, catalogs: &[Catalog]) -> Result<()>;

    async fn delete_catalog(&self, id: &str) -> Result<bool>;

    async fn delete_file(&self, id: &str) -> Result<bool>;

    /// Point every file labelled `from` at `to`, returning how many moved
    async fn reassign_catalog(&self, from: &str, to: Option<&str>) -> Result<u64>;
}

/// SQLite-backed cache
#[derive(Clone)]
pub struct SqliteCache {
    pool: SqlitePool,
}

impl SqliteCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fresh in-memory cache with the schema applied
    pub async fn in_memory() -> Result<Self> {
        let pool = super::create_memory_pool().await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl LocalCache for SqliteCache {
    async fn list_catalogs(&self) -> Result<Vec<Catalog>> {
        let rows = sqlx::query_as::<_, CatalogRow>(
            r#"
            SELECT id, name, description, created_at, sort_order
            FROM catalogs
            ORDER BY COALESCE(sort_order, 999999) ASC, name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CatalogRow::into_catalog).collect())
    }

    async fn list_files(&self) -> Result<Vec<FileRecord>> {
        let rows = sqlx::query_as::<_, FileRow>(
            r#"
            SELECT id, name, url, data, catalog, created_at, is_local
            FROM files
            ORDER BY COALESCE(created_at, 0) DESC, name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(FileRow::into_record).collect())
    }

    async fn get_catalog(&self, id: &str) -> Result<Option<Catalog>> {
        let row = sqlx::query_as::<_, CatalogRow>(
            "SELECT id, name, description, created_at, sort_order FROM catalogs WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CatalogRow::into_catalog))
    }

    async fn get_file(&self, id: &str) -> Result<Option<FileRecord>> {
        let row = sqlx::query_as::<_, FileRow>(
            r#"
            SELECT id, name, url, data, catalog, created_at, is_local
            FROM files
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(FileRow::into_record))
    }

    async fn upsert_catalog(&self, catalog: &Catalog) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO catalogs (id, name, description, created_at, sort_order)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                sort_order = excluded.sort_order
            "#,
        )
        .bind(&catalog.id)
        .bind(&catalog.name)
        .bind(&catalog.description)
        .bind(catalog.created_at)
        .bind(catalog.order)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_file(&self, id: &str, record: &FileRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO files (id, name, url, data, catalog, created_at, is_local)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                url = excluded.url,
                data = excluded.data,
                catalog = excluded.catalog,
                created_at = excluded.created_at,
                is_local = excluded.is_local
            "#,
        )
        .bind(id)
        .bind(&record.name)
        .bind(&record.url)
        .bind(&record.data)
        .bind(&record.catalog)
        .bind(record.created_at)
        .bind(record.is_local)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn replace_catalogs(&self, catalogs: &[Catalog]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM catalogs").execute(&mut *tx).await?;

        for catalog in catalogs {
            sqlx::query(
                r#"
                INSERT INTO catalogs (id, name, description, created_at, sort_order)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&catalog.id)
            .bind(&catalog.name)
            .bind(&catalog.description)
            .bind(catalog.created_at)
            .bind(catalog.order)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_catalog(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM catalogs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_file(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn reassign_catalog(&self, from: &str, to: Option<&str>) -> Result<u64> {
        let result = sqlx::query("UPDATE files SET catalog = ? WHERE catalog = ?")
            .bind(to)
            .bind(from)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct CatalogRow {
    id: String,
    name: String,
    description: String,
    created_at: i64,
    sort_order: Option<i64>,
}

impl CatalogRow {
    fn into_catalog(self) -> Catalog {
        Catalog {
            id: self.id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            order: self.sort_order,
        }
    }
}

#[derive(sqlx::FromRow)]
struct FileRow {
    id: String,
    name: String,
    url: Option<String>,
    data: Option<Vec<u8>>,
    catalog: Option<String>,
    created_at: Option<i64>,
    is_local: bool,
}

impl FileRow {
    fn into_record(self) -> FileRecord {
        FileRecord {
            id: self.id,
            name: self.name,
            url: self.url,
            data: self.data,
            catalog: self.catalog,
            created_at: self.created_at,
            is_local: self.is_local,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(id: &str, name: &str, order: Option<i64>) -> Catalog {
        Catalog {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            created_at: 1,
            order,
        }
    }

    fn file(id: &str, catalog: Option<&str>, created_at: i64) -> FileRecord {
        FileRecord {
            id: id.to_string(),
            name: format!("{}.pdf", id),
            url: None,
            data: Some(vec![1, 2, 3]),
            catalog: catalog.map(str::to_string),
            created_at: Some(created_at),
            is_local: true,
        }
    }

    #[tokio::test]
    async fn test_catalog_ordering() {
        let cache = SqliteCache::in_memory().await.unwrap();
        cache.upsert_catalog(&catalog("c1", "Zeta", None)).await.unwrap();
        cache.upsert_catalog(&catalog("c2", "Beta", Some(1))).await.unwrap();
        cache.upsert_catalog(&catalog("c3", "Alpha", Some(1))).await.unwrap();
        cache.upsert_catalog(&catalog("c4", "Omega", Some(0))).await.unwrap();

        let names: Vec<String> = cache
            .list_catalogs()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Omega", "Alpha", "Beta", "Zeta"]);
    }

    #[tokio::test]
    async fn test_file_round_trip_keeps_bytes() {
        let cache = SqliteCache::in_memory().await.unwrap();
        let record = file("a", Some("Work"), 10);
        cache.upsert_file(&record.id, &record).await.unwrap();

        let stored = cache.get_file("a").await.unwrap().unwrap();
        assert_eq!(stored, record);
    }

    #[tokio::test]
    async fn test_files_newest_first() {
        let cache = SqliteCache::in_memory().await.unwrap();
        for (id, at) in [("old", 1), ("new", 3), ("mid", 2)] {
            let record = file(id, None, at);
            cache.upsert_file(id, &record).await.unwrap();
        }

        let ids: Vec<String> = cache
            .list_files()
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_replace_catalogs_clears_previous() {
        let cache = SqliteCache::in_memory().await.unwrap();
        cache.upsert_catalog(&catalog("old", "Old", Some(0))).await.unwrap();

        cache
            .replace_catalogs(&[catalog("n1", "New", Some(0)), catalog("n2", "Other", Some(1))])
            .await
            .unwrap();

        let catalogs = cache.list_catalogs().await.unwrap();
        assert_eq!(catalogs.len(), 2);
        assert!(cache.get_catalog("old").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_catalogs_rolls_back_on_duplicate_names() {
        let cache = SqliteCache::in_memory().await.unwrap();
        cache.upsert_catalog(&catalog("keep", "Keep", Some(0))).await.unwrap();

        let result = cache
            .replace_catalogs(&[catalog("d1", "Dup", None), catalog("d2", "Dup", None)])
            .await;
        assert!(result.is_err());

        let catalogs = cache.list_catalogs().await.unwrap();
        assert_eq!(catalogs.len(), 1);
        assert_eq!(catalogs[0].id, "keep");
    }

    #[tokio::test]
    async fn test_reassign_and_delete() {
        let cache = SqliteCache::in_memory().await.unwrap();
        for id in ["a", "b"] {
            let record = file(id, Some("Work"), 1);
            cache.upsert_file(id, &record).await.unwrap();
        }
        let other = file("c", Some("Home"), 1);
        cache.upsert_file("c", &other).await.unwrap();

        let moved = cache.reassign_catalog("Work", None).await.unwrap();
        assert_eq!(moved, 2);
        assert_eq!(cache.get_file("a").await.unwrap().unwrap().catalog, None);
        assert_eq!(
            cache.get_file("c").await.unwrap().unwrap().catalog.as_deref(),
            Some("Home")
        );

        assert!(cache.delete_file("a").await.unwrap());
        assert!(!cache.delete_file("a").await.unwrap());
    }
}
