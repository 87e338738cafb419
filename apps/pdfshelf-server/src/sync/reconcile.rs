//! Merge a cloud document into the local cache

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::db::LocalCache;
use crate::error::Result;
use crate::library::{Catalog, FileRecord, MetadataDocument};

/// What a reconciliation changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub catalogs_replaced: usize,
    pub files_updated: usize,
    pub files_inserted: usize,
    pub files_unchanged: usize,
}

/// Apply `doc` to the cache.
///
/// Catalogs are replaced wholesale when the cloud list is non-empty. Files
/// merge by id: known records take the cloud `catalog` and `name` and keep
/// everything else; unknown ids are inserted; local-only ids stay as they are.
pub async fn reconcile(cache: &dyn LocalCache, doc: &MetadataDocument) -> Result<ReconcileReport> {
    let mut report = ReconcileReport::default();

    if !doc.catalogs.is_empty() {
        let catalogs = dedupe_by_name(&doc.catalogs);
        cache.replace_catalogs(&catalogs).await?;
        report.catalogs_replaced = catalogs.len();
    }

    let local: HashMap<String, FileRecord> = cache
        .list_files()
        .await?
        .into_iter()
        .map(|f| (f.id.clone(), f))
        .collect();

    for remote in &doc.files {
        match local.get(&remote.id) {
            Some(existing) if existing.catalog == remote.catalog && existing.name == remote.name => {
                report.files_unchanged += 1;
            }
            Some(existing) => {
                let merged = FileRecord {
                    catalog: remote.catalog.clone(),
                    name: remote.name.clone(),
                    ..existing.clone()
                };
                cache.upsert_file(&remote.id, &merged).await?;
                report.files_updated += 1;
            }
            None => {
                cache.upsert_file(&remote.id, &remote.clone().without_data()).await?;
                report.files_inserted += 1;
            }
        }
    }

    tracing::debug!(
        "Reconciled {} catalogs, {} files updated, {} inserted, {} unchanged",
        report.catalogs_replaced,
        report.files_updated,
        report.files_inserted,
        report.files_unchanged
    );

    Ok(report)
}

/// Keep the first catalog for each name; the cache enforces unique names
fn dedupe_by_name(catalogs: &[Catalog]) -> Vec<Catalog> {
    let mut seen = HashSet::new();
    catalogs
        .iter()
        .filter(|c| {
            let fresh = seen.insert(c.name.as_str());
            if !fresh {
                tracing::warn!("Dropping duplicate cloud catalog '{}' ({})", c.name, c.id);
            }
            fresh
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteCache;

    fn cloud_file(id: &str, name: &str, catalog: Option<&str>) -> FileRecord {
        FileRecord {
            id: id.to_string(),
            name: name.to_string(),
            url: None,
            data: None,
            catalog: catalog.map(str::to_string),
            created_at: None,
            is_local: false,
        }
    }

    fn catalog(id: &str, name: &str) -> Catalog {
        Catalog {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            created_at: 1,
            order: None,
        }
    }

    #[tokio::test]
    async fn test_cloud_catalog_applied_to_local_bytes() {
        let cache = SqliteCache::in_memory().await.unwrap();
        let local = FileRecord {
            id: "a".to_string(),
            name: "x.pdf".to_string(),
            url: None,
            data: Some(b"%PDF-1.4".to_vec()),
            catalog: None,
            created_at: Some(10),
            is_local: true,
        };
        cache.upsert_file("a", &local).await.unwrap();

        let doc = MetadataDocument::new(vec![], vec![cloud_file("a", "x.pdf", Some("Work"))], Some(1));
        let report = reconcile(&cache, &doc).await.unwrap();
        assert_eq!(report.files_updated, 1);

        let merged = cache.get_file("a").await.unwrap().unwrap();
        assert_eq!(merged.catalog.as_deref(), Some("Work"));
        assert_eq!(merged.data.as_deref(), Some(&b"%PDF-1.4"[..]));
        assert!(merged.is_local);
        assert_eq!(merged.created_at, Some(10));
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let cache = SqliteCache::in_memory().await.unwrap();
        let doc = MetadataDocument::new(
            vec![catalog("c1", "Work"), catalog("c2", "Home")],
            vec![
                cloud_file("a", "a.pdf", Some("Work")),
                cloud_file("b", "b.pdf", None),
            ],
            Some(1),
        );

        reconcile(&cache, &doc).await.unwrap();
        let catalogs = cache.list_catalogs().await.unwrap();
        let files = cache.list_files().await.unwrap();

        let second = reconcile(&cache, &doc).await.unwrap();
        assert_eq!(second.files_unchanged, 2);
        assert_eq!(second.files_inserted + second.files_updated, 0);
        assert_eq!(cache.list_catalogs().await.unwrap(), catalogs);
        assert_eq!(cache.list_files().await.unwrap(), files);
    }

    #[tokio::test]
    async fn test_local_only_files_untouched() {
        let cache = SqliteCache::in_memory().await.unwrap();
        let mine = FileRecord::local("mine.pdf", vec![7; 4], Some("Home".to_string()));
        cache.upsert_file(&mine.id, &mine).await.unwrap();

        let doc = MetadataDocument::new(vec![], vec![cloud_file("other", "o.pdf", None)], None);
        let report = reconcile(&cache, &doc).await.unwrap();
        assert_eq!(report.files_inserted, 1);

        assert_eq!(cache.get_file(&mine.id).await.unwrap().unwrap(), mine);
    }

    #[tokio::test]
    async fn test_empty_cloud_catalogs_keep_local() {
        let cache = SqliteCache::in_memory().await.unwrap();
        cache.upsert_catalog(&catalog("c1", "Work")).await.unwrap();

        let doc = MetadataDocument::new(vec![], vec![cloud_file("a", "a.pdf", None)], None);
        let report = reconcile(&cache, &doc).await.unwrap();
        assert_eq!(report.catalogs_replaced, 0);
        assert_eq!(cache.list_catalogs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_cloud_catalog_names_collapse() {
        let cache = SqliteCache::in_memory().await.unwrap();
        let doc = MetadataDocument::new(
            vec![catalog("c1", "Work"), catalog("c2", "Work")],
            vec![],
            None,
        );

        let report = reconcile(&cache, &doc).await.unwrap();
        assert_eq!(report.catalogs_replaced, 1);
        assert_eq!(cache.list_catalogs().await.unwrap()[0].id, "c1");
    }
}
