//! File operations

use tokio::time::timeout;

use super::{now_millis, FileContent, FileRecord, Library};
use crate::error::{AppError, ProviderError, Result};
use crate::storage::BlobClient;

const PDF_CONTENT_TYPE: &str = "application/pdf";
const PDF_PREFIX: &str = "pdfs/";

/// A file's bytes, ready to serve
#[derive(Debug, Clone)]
pub struct FileBody {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Library {
    /// All files, newest first, without their bytes
    pub async fn list_files(&self) -> Result<Vec<FileRecord>> {
        let files = self.cache.list_files().await?;
        Ok(files.into_iter().map(FileRecord::without_data).collect())
    }

    /// Store an uploaded PDF.
    ///
    /// With a blob token the bytes go to Blob storage and the record is keyed
    /// by the blob URL. Without one, or when the upload fails, the bytes are
    /// kept in the local cache instead.
    pub async fn add_file(
        &self,
        name: &str,
        content_type: &str,
        data: Vec<u8>,
        catalog: Option<String>,
    ) -> Result<FileRecord> {
        if !is_pdf(content_type) {
            return Err(AppError::BadRequest(format!(
                "Only PDF files are accepted, got {}",
                content_type
            )));
        }

        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("File name is required".to_string()));
        }
        if data.is_empty() {
            return Err(AppError::BadRequest("File is empty".to_string()));
        }

        let catalog = self.existing_catalog(catalog).await?;
        let size = data.len();

        let uploaded = match &self.blob {
            Some(blob) => self.upload_to_blob(blob, name, &data).await,
            None => None,
        };
        let record = match uploaded {
            Some(url) => FileRecord::remote(&url, name, catalog),
            None => FileRecord::local(name, data, catalog),
        };
        self.cache.upsert_file(&record.id, &record).await?;

        tracing::info!("Stored {} ({} bytes) as {}", record.name, size, record.id);
        self.changed();
        Ok(record.without_data())
    }

    /// Upload to `pdfs/<ms>-<name>`, returning the blob URL
    async fn upload_to_blob(&self, blob: &BlobClient, name: &str, data: &[u8]) -> Option<String> {
        let pathname = format!("{}{}-{}", PDF_PREFIX, now_millis(), name);
        let limit = self.timeouts.transfer;

        match timeout(limit, blob.put(&pathname, data.to_vec(), PDF_CONTENT_TYPE)).await {
            Ok(Ok(entry)) => Some(entry.url),
            Ok(Err(e)) => {
                tracing::warn!("Blob upload of {} failed, keeping it locally: {}", name, e);
                None
            }
            Err(_) => {
                tracing::warn!(
                    "Blob upload of {} timed out after {:?}, keeping it locally",
                    name,
                    limit
                );
                None
            }
        }
    }

    /// Move a file to another catalog, or to none
    pub async fn assign_catalog(&self, id: &str, catalog: Option<String>) -> Result<FileRecord> {
        let mut record = self.file(id).await?;
        record.catalog = self.existing_catalog(catalog).await?;
        self.cache.upsert_file(id, &record).await?;

        self.changed();
        Ok(record.without_data())
    }

    /// Delete a file. Remote content is removed on a best-effort basis; the
    /// local record is always deleted.
    pub async fn delete_file(&self, id: &str) -> Result<()> {
        let record = self.file(id).await?;

        if let FileContent::Remote(url) = record.content() {
            match &self.blob {
                Some(blob) => match timeout(self.timeouts.delete, blob.delete(&[url])).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::warn!("Failed to delete remote copy of {}: {}", record.name, e)
                    }
                    Err(_) => tracing::warn!(
                        "Deleting remote copy of {} timed out after {:?}",
                        record.name,
                        self.timeouts.delete
                    ),
                },
                None => tracing::debug!("No blob token configured, keeping {}", url),
            }
        }

        self.cache.delete_file(id).await?;
        tracing::info!("Deleted file {}", record.name);
        self.changed();
        Ok(())
    }

    /// Resolve a file's bytes from its authoritative source
    pub async fn file_content(&self, id: &str) -> Result<FileBody> {
        let record = self.file(id).await?;

        let bytes = match record.content() {
            FileContent::Remote(url) => self.download(url).await?,
            FileContent::Local(data) => data.to_vec(),
            FileContent::Missing => {
                return Err(AppError::NotFound(format!(
                    "No content stored for {}",
                    record.name
                )))
            }
        };

        Ok(FileBody {
            name: record.name,
            bytes,
        })
    }

    /// Fetch remote bytes within the transfer timeout
    async fn download(&self, url: &str) -> std::result::Result<Vec<u8>, ProviderError> {
        let fetch = async {
            let response = self.http.get(url).send().await?;
            if !response.status().is_success() {
                return Err(ProviderError::from_response(response).await);
            }
            Ok::<_, ProviderError>(response.bytes().await?.to_vec())
        };

        timeout(self.timeouts.transfer, fetch)
            .await
            .map_err(|_| ProviderError::Timeout(self.timeouts.transfer))?
    }

    async fn file(&self, id: &str) -> Result<FileRecord> {
        self.cache
            .get_file(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("File not found: {}", id)))
    }

    /// Normalize a catalog label, requiring that it names a catalog
    async fn existing_catalog(&self, catalog: Option<String>) -> Result<Option<String>> {
        let Some(name) = catalog.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()) else {
            return Ok(None);
        };

        let known = self
            .cache
            .list_catalogs()
            .await?
            .iter()
            .any(|c| c.name == name);
        if !known {
            return Err(AppError::BadRequest(format!("Unknown catalog: {}", name)));
        }
        Ok(Some(name))
    }
}

fn is_pdf(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case(PDF_CONTENT_TYPE))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::routing::{get, post, put};
    use axum::{Json, Router};
    use serde_json::json;
    use tokio::net::TcpListener;

    use super::super::testing::{library, library_with_blob};
    use super::super::RemoteTimeouts;
    use super::*;
    use crate::config::BlobConfig;
    use crate::db::LocalCache;

    const PDF: &[u8] = b"%PDF-1.7\n%%EOF";

    async fn bind() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        (listener, base)
    }

    fn spawn(listener: TcpListener, router: Router) {
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
    }

    fn blob(base: &str) -> BlobClient {
        BlobClient::from_config(&BlobConfig {
            token: Some("test-token".to_string()),
            api_url: base.to_string(),
        })
        .unwrap()
    }

    fn short_timeouts() -> RemoteTimeouts {
        RemoteTimeouts {
            transfer: Duration::from_millis(200),
            delete: Duration::from_millis(200),
        }
    }

    async fn hang() -> StatusCode {
        tokio::time::sleep(Duration::from_secs(120)).await;
        StatusCode::OK
    }

    #[test]
    fn test_is_pdf() {
        assert!(is_pdf("application/pdf"));
        assert!(is_pdf("Application/PDF; charset=binary"));
        assert!(!is_pdf("text/plain"));
        assert!(!is_pdf(""));
    }

    #[tokio::test]
    async fn test_upload_and_read_back() {
        let (library, _, _) = library().await;
        library.create_catalog("Work", "").await.unwrap();

        let record = library
            .add_file("report.pdf", "application/pdf", PDF.to_vec(), Some("Work".into()))
            .await
            .unwrap();
        assert!(record.is_local);
        assert!(record.data.is_none());
        assert_eq!(record.catalog.as_deref(), Some("Work"));

        let body = library.file_content(&record.id).await.unwrap();
        assert_eq!(body.bytes, PDF);
        assert_eq!(library.list_files().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_rejects_non_pdf() {
        let (library, _, _) = library().await;
        assert!(matches!(
            library.add_file("a.txt", "text/plain", b"hi".to_vec(), None).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            library.add_file("a.pdf", "application/pdf", vec![], None).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_assign_catalog() {
        let (library, _, _) = library().await;
        library.create_catalog("Study", "").await.unwrap();
        let record = library
            .add_file("notes.pdf", "application/pdf", PDF.to_vec(), None)
            .await
            .unwrap();

        let moved = library
            .assign_catalog(&record.id, Some("Study".into()))
            .await
            .unwrap();
        assert_eq!(moved.catalog.as_deref(), Some("Study"));

        let cleared = library.assign_catalog(&record.id, None).await.unwrap();
        assert_eq!(cleared.catalog, None);

        assert!(matches!(
            library.assign_catalog(&record.id, Some("Nope".into())).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            library.assign_catalog("missing", None).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_remote_without_blob_token() {
        let (library, cache, _) = library().await;
        let remote = FileRecord::remote("http://127.0.0.1:9/a.pdf", "a.pdf", None);
        cache.upsert_file(&remote.id, &remote).await.unwrap();

        library.delete_file(&remote.id).await.unwrap();
        assert!(cache.get_file(&remote.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_content() {
        let (library, cache, _) = library().await;
        let record = FileRecord {
            id: "bare".to_string(),
            name: "bare.pdf".to_string(),
            url: None,
            data: None,
            catalog: None,
            created_at: None,
            is_local: false,
        };
        cache.upsert_file("bare", &record).await.unwrap();

        assert!(matches!(
            library.file_content("bare").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_goes_to_blob_when_configured() {
        let (listener, base) = bind().await;
        let public = base.clone();
        let router = Router::new()
            .route(
                "/pdfs/*name",
                put(move |Path(name): Path<String>| {
                    let public = public.clone();
                    async move {
                        Json(json!({
                            "url": format!("{}/public/pdfs/{}", public, name),
                            "pathname": format!("pdfs/{}", name),
                        }))
                    }
                }),
            )
            .route("/public/*name", get(|| async { PDF.to_vec() }));
        spawn(listener, router);

        let (library, cache, _) = library_with_blob(Some(blob(&base))).await;
        let record = library
            .add_file("report.pdf", "application/pdf", PDF.to_vec(), None)
            .await
            .unwrap();

        assert!(!record.is_local);
        assert_eq!(record.url.as_deref(), Some(record.id.as_str()));
        assert!(record.id.starts_with(&format!("{}/public/pdfs/", base)));
        assert!(record.id.ends_with("-report.pdf"));

        let stored = cache.get_file(&record.id).await.unwrap().unwrap();
        assert!(stored.data.is_none());

        let body = library.file_content(&record.id).await.unwrap();
        assert_eq!(body.bytes, PDF);
    }

    #[tokio::test]
    async fn test_failed_blob_upload_keeps_bytes_locally() {
        let (listener, base) = bind().await;
        let router = Router::new().route(
            "/pdfs/*name",
            put(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "quota exceeded") }),
        );
        spawn(listener, router);

        let (library, _, _) = library_with_blob(Some(blob(&base))).await;
        let record = library
            .add_file("report.pdf", "application/pdf", PDF.to_vec(), None)
            .await
            .unwrap();

        assert!(record.is_local);
        assert!(record.id.starts_with("local-report.pdf-"));
        assert_eq!(library.file_content(&record.id).await.unwrap().bytes, PDF);
    }

    #[tokio::test]
    async fn test_hung_blob_delete_still_removes_record() {
        let (listener, base) = bind().await;
        spawn(listener, Router::new().route("/delete", post(hang)));

        let (library, cache, _) = library_with_blob(Some(blob(&base))).await;
        let library = library.with_timeouts(short_timeouts());
        let remote = FileRecord::remote(&format!("{}/public/a.pdf", base), "a.pdf", None);
        cache.upsert_file(&remote.id, &remote).await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), library.delete_file(&remote.id))
            .await
            .expect("delete should not wait on the blob endpoint")
            .unwrap();
        assert!(cache.get_file(&remote.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_hung_content_fetch_times_out() {
        let (listener, base) = bind().await;
        spawn(listener, Router::new().route("/public/*name", get(hang)));

        let (library, cache, _) = library().await;
        let library = library.with_timeouts(short_timeouts());
        let remote = FileRecord::remote(&format!("{}/public/a.pdf", base), "a.pdf", None);
        cache.upsert_file(&remote.id, &remote).await.unwrap();

        let result =
            tokio::time::timeout(Duration::from_secs(5), library.file_content(&remote.id)).await;
        assert!(matches!(
            result,
            Ok(Err(AppError::Provider(ProviderError::Timeout(_))))
        ));
    }
}
