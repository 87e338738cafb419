//! Configuration management for the PDF Shelf server

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

/// Bounds for the deferred startup sync delay
pub const MIN_SYNC_DELAY_MS: u64 = 100;
pub const MAX_SYNC_DELAY_MS: u64 = 500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown METADATA_STORAGE value: {0}")]
    UnknownProvider(String),

    #[error("invalid value for {name}: {value}")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub sync: SyncConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Which metadata provider is active. Selected once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageProvider {
    Supabase,
    VercelKv,
    VercelBlob,
    Github,
    Local,
}

impl StorageProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageProvider::Supabase => "supabase",
            StorageProvider::VercelKv => "vercel-kv",
            StorageProvider::VercelBlob => "vercel-blob",
            StorageProvider::Github => "github",
            StorageProvider::Local => "local",
        }
    }
}

impl FromStr for StorageProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "supabase" => Ok(StorageProvider::Supabase),
            "vercel-kv" | "kv" | "upstash" => Ok(StorageProvider::VercelKv),
            "vercel-blob" | "blob" => Ok(StorageProvider::VercelBlob),
            "github" => Ok(StorageProvider::Github),
            "local" => Ok(StorageProvider::Local),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

impl std::fmt::Display for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub provider: StorageProvider,
    pub blob: BlobConfig,
    pub kv: KvConfig,
    pub supabase: SupabaseConfig,
    pub github: GithubConfig,
    pub local: LocalConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlobConfig {
    pub token: Option<String>,
    pub api_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KvConfig {
    pub rest_url: Option<String>,
    pub rest_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    pub token: Option<String>,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub path: String,
    pub api_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Delay before the startup pull, in milliseconds
    pub delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub max_bytes: usize,
    /// Bound on moving PDF bytes to or from Blob storage, in milliseconds
    pub transfer_timeout_ms: u64,
    /// Bound on removing a PDF from Blob storage, in milliseconds
    pub delete_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: "sqlite:./pdfshelf.db".to_string(),
            },
            storage: StorageConfig {
                provider: StorageProvider::Local,
                blob: BlobConfig {
                    token: None,
                    api_url: "https://blob.vercel-storage.com".to_string(),
                },
                kv: KvConfig {
                    rest_url: None,
                    rest_token: None,
                },
                supabase: SupabaseConfig {
                    url: None,
                    key: None,
                },
                github: GithubConfig {
                    token: None,
                    owner: None,
                    repo: None,
                    path: "data/metadata.json".to_string(),
                    api_url: "https://api.github.com".to_string(),
                },
                local: LocalConfig {
                    path: PathBuf::from("./pdf-metadata-backup.json"),
                },
            },
            sync: SyncConfig {
                delay_ms: MIN_SYNC_DELAY_MS,
            },
            upload: UploadConfig {
                max_bytes: 50 * 1024 * 1024,
                transfer_timeout_ms: 55_000,
                delete_timeout_ms: 10_000,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source.
    ///
    /// Empty values count as absent, so `KV_REST_API_URL=` leaves the KV
    /// provider unconfigured.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        let port = match var("SERVER_PORT") {
            Some(v) => v.parse().map_err(|_| ConfigError::InvalidNumber {
                name: "SERVER_PORT",
                value: v,
            })?,
            None => defaults.server.port,
        };

        let provider = match var("METADATA_STORAGE").map(|v| v.parse::<StorageProvider>()) {
            Some(Ok(provider)) => provider,
            Some(Err(e)) => {
                tracing::warn!("{}, using local storage", e);
                StorageProvider::Local
            }
            None => defaults.storage.provider,
        };

        let delay_ms = match var("SYNC_DELAY_MS") {
            Some(v) => v.parse::<u64>().map_err(|_| ConfigError::InvalidNumber {
                name: "SYNC_DELAY_MS",
                value: v,
            })?,
            None => defaults.sync.delay_ms,
        };

        let max_bytes = match var("MAX_UPLOAD_BYTES") {
            Some(v) => v.parse().map_err(|_| ConfigError::InvalidNumber {
                name: "MAX_UPLOAD_BYTES",
                value: v,
            })?,
            None => defaults.upload.max_bytes,
        };

        let transfer_timeout_ms = match var("TRANSFER_TIMEOUT_MS") {
            Some(v) => v.parse().map_err(|_| ConfigError::InvalidNumber {
                name: "TRANSFER_TIMEOUT_MS",
                value: v,
            })?,
            None => defaults.upload.transfer_timeout_ms,
        };

        let delete_timeout_ms = match var("DELETE_TIMEOUT_MS") {
            Some(v) => v.parse().map_err(|_| ConfigError::InvalidNumber {
                name: "DELETE_TIMEOUT_MS",
                value: v,
            })?,
            None => defaults.upload.delete_timeout_ms,
        };

        Ok(Config {
            server: ServerConfig {
                host: var("SERVER_HOST").unwrap_or(defaults.server.host),
                port,
            },
            database: DatabaseConfig {
                url: var("DATABASE_URL").unwrap_or(defaults.database.url),
            },
            storage: StorageConfig {
                provider,
                blob: BlobConfig {
                    token: var("BLOB_READ_WRITE_TOKEN"),
                    api_url: var("BLOB_API_URL").unwrap_or(defaults.storage.blob.api_url),
                },
                kv: KvConfig {
                    rest_url: var("KV_REST_API_URL").map(|u| u.trim_end_matches('/').to_string()),
                    rest_token: var("KV_REST_API_TOKEN"),
                },
                supabase: SupabaseConfig {
                    url: var("SUPABASE_URL").map(|u| u.trim_end_matches('/').to_string()),
                    key: var("SUPABASE_ANON_KEY").or_else(|| var("SUPABASE_KEY")),
                },
                github: GithubConfig {
                    token: var("GITHUB_TOKEN"),
                    owner: var("GITHUB_OWNER"),
                    repo: var("GITHUB_REPO"),
                    path: var("GITHUB_METADATA_PATH").unwrap_or(defaults.storage.github.path),
                    api_url: var("GITHUB_API_URL").unwrap_or(defaults.storage.github.api_url),
                },
                local: LocalConfig {
                    path: var("LOCAL_METADATA_PATH")
                        .map(PathBuf::from)
                        .unwrap_or(defaults.storage.local.path),
                },
            },
            sync: SyncConfig {
                delay_ms: delay_ms.clamp(MIN_SYNC_DELAY_MS, MAX_SYNC_DELAY_MS),
            },
            upload: UploadConfig {
                max_bytes,
                transfer_timeout_ms,
                delete_timeout_ms,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.storage.provider, StorageProvider::Local);
        assert_eq!(config.server.port, 3000);
        assert!(config.storage.kv.rest_url.is_none());
        assert_eq!(config.sync.delay_ms, MIN_SYNC_DELAY_MS);
    }

    #[test]
    fn test_provider_selection() {
        let config = Config::from_lookup(lookup(&[
            ("METADATA_STORAGE", "vercel-kv"),
            ("KV_REST_API_URL", "https://example.upstash.io/"),
            ("KV_REST_API_TOKEN", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.storage.provider, StorageProvider::VercelKv);
        assert_eq!(
            config.storage.kv.rest_url.as_deref(),
            Some("https://example.upstash.io")
        );
    }

    #[test]
    fn test_unknown_provider_keeps_rest_of_env() {
        let config = Config::from_lookup(lookup(&[
            ("METADATA_STORAGE", "dropbox"),
            ("SERVER_PORT", "4100"),
            ("DATABASE_URL", "sqlite:shelf.db"),
            ("BLOB_READ_WRITE_TOKEN", "token"),
        ]))
        .unwrap();

        assert_eq!(config.storage.provider, StorageProvider::Local);
        assert_eq!(config.server.port, 4100);
        assert_eq!(config.database.url, "sqlite:shelf.db");
        assert_eq!(config.storage.blob.token.as_deref(), Some("token"));
    }

    #[test]
    fn test_unknown_provider_name_is_an_error() {
        assert!(matches!(
            "dropbox".parse::<StorageProvider>(),
            Err(ConfigError::UnknownProvider(_))
        ));
    }

    #[test]
    fn test_empty_values_are_absent() {
        let config = Config::from_lookup(lookup(&[
            ("SUPABASE_URL", ""),
            ("SUPABASE_KEY", "  "),
        ]))
        .unwrap();
        assert!(config.storage.supabase.url.is_none());
        assert!(config.storage.supabase.key.is_none());
    }

    #[test]
    fn test_supabase_key_fallback() {
        let config = Config::from_lookup(lookup(&[("SUPABASE_KEY", "service")])).unwrap();
        assert_eq!(config.storage.supabase.key.as_deref(), Some("service"));
    }

    #[test]
    fn test_sync_delay_is_clamped() {
        let low = Config::from_lookup(lookup(&[("SYNC_DELAY_MS", "5")])).unwrap();
        assert_eq!(low.sync.delay_ms, MIN_SYNC_DELAY_MS);

        let high = Config::from_lookup(lookup(&[("SYNC_DELAY_MS", "9000")])).unwrap();
        assert_eq!(high.sync.delay_ms, MAX_SYNC_DELAY_MS);
    }
}
