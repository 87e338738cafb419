//! Library data types
//!
//! Wire shapes use camelCase and epoch-millisecond timestamps so documents
//! written by older clients stay readable.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sort position given to catalogs that were never reordered
pub const UNORDERED: i64 = 999_999;

/// Current epoch time in milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Short random tag that keeps ids minted in the same millisecond apart
fn id_suffix(len: usize) -> String {
    Uuid::new_v4().simple().to_string().chars().take(len).collect()
}

/// A user-defined grouping label for files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl Catalog {
    /// Create a catalog with a fresh id
    pub fn new(name: &str, description: &str, order: i64) -> Self {
        let created_at = now_millis();
        Self {
            id: format!("catalog-{}-{}", created_at, id_suffix(9)),
            name: name.to_string(),
            description: description.to_string(),
            created_at,
            order: Some(order),
        }
    }

    pub fn sort_order(&self) -> i64 {
        self.order.unwrap_or(UNORDERED)
    }
}

/// A cataloged PDF.
///
/// Content lives either behind `url` (cloud copy) or in `data` (bytes cached
/// locally). `data` never appears in JSON: documents and listings carry
/// metadata only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(skip)]
    pub data: Option<Vec<u8>>,
    #[serde(default)]
    pub catalog: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub is_local: bool,
}

/// Where a file's bytes come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileContent<'a> {
    Remote(&'a str),
    Local(&'a [u8]),
    Missing,
}

impl FileRecord {
    /// A file whose bytes are cached locally
    pub fn local(name: &str, data: Vec<u8>, catalog: Option<String>) -> Self {
        let created_at = now_millis();
        Self {
            id: format!("local-{}-{}-{}", name, created_at, id_suffix(8)),
            name: name.to_string(),
            url: None,
            data: Some(data),
            catalog,
            created_at: Some(created_at),
            is_local: true,
        }
    }

    /// A file stored in the cloud, identified by its URL
    pub fn remote(url: &str, name: &str, catalog: Option<String>) -> Self {
        Self {
            id: url.to_string(),
            name: name.to_string(),
            url: Some(url.to_string()),
            data: None,
            catalog,
            created_at: Some(now_millis()),
            is_local: false,
        }
    }

    /// Resolve which source is authoritative for this record's bytes
    pub fn content(&self) -> FileContent<'_> {
        match (&self.url, &self.data) {
            (Some(url), _) if !self.is_local => FileContent::Remote(url),
            (_, Some(data)) => FileContent::Local(data),
            _ => FileContent::Missing,
        }
    }

    /// Drop cached bytes, keeping only the metadata that gets mirrored
    pub fn without_data(mut self) -> Self {
        self.data = None;
        self
    }
}

fn default_version() -> u32 {
    1
}

/// The catalog and file list, synced wholesale with the cloud
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataDocument {
    pub catalogs: Vec<Catalog>,
    pub files: Vec<FileRecord>,
    #[serde(default)]
    pub last_sync: Option<i64>,
    #[serde(default = "default_version")]
    pub version: u32,
}

impl MetadataDocument {
    pub fn new(catalogs: Vec<Catalog>, files: Vec<FileRecord>, last_sync: Option<i64>) -> Self {
        Self {
            catalogs,
            files,
            last_sync,
            version: default_version(),
        }
    }

    /// The document served when a provider has nothing stored yet
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), None)
    }

    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty() && self.files.is_empty()
    }

    /// Stamp the document the way every provider persists it
    pub fn normalized(mut self, now: i64) -> Self {
        self.version = default_version();
        self.last_sync.get_or_insert(now);
        for file in &mut self.files {
            file.data = None;
        }
        self
    }
}
