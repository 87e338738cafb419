//! PDF Shelf Server Library
//!
//! Keeps a PDF library's catalog and file list in a local SQLite cache and
//! mirrors it to one pluggable cloud provider. The server binary is in
//! main.rs; integration tests build the router from here.
//!
//! # Modules
//!
//! - `storage`: provider adapters (Vercel Blob, Vercel KV, Supabase, GitHub, local file)
//! - `sync`: fail-soft mirror, reconciliation and background sync
//! - `library`: catalog and file operations
//! - `routes`: HTTP surface

pub mod config;
pub mod db;
pub mod error;
pub mod library;
pub mod routes;
pub mod state;
pub mod storage;
pub mod sync;

pub use config::Config;
pub use error::{AppError, ProviderError, Result};
pub use state::AppState;
