//! Cloud storage for the metadata document

mod blob;
mod github;
mod http;
mod kv;
mod local;
mod provider;
mod supabase;
mod types;

pub use blob::{BlobClient, BlobEntry, BlobProvider};
pub use github::GithubProvider;
pub use http::client as http_client;
pub use kv::KvProvider;
pub use local::LocalFileProvider;
pub use provider::{build_provider, MetadataProvider};
pub use supabase::SupabaseProvider;
pub use types::{SaveReceipt, Timeouts};

#[cfg(test)]
pub use provider::MockProvider;
