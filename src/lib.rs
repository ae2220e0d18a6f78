//! file-store - An authenticated blob storage gateway with metadata indexing
//!
//! This crate provides file upload, download, and metadata management with:
//! - Swappable byte-storage backends (local filesystem, remote object store)
//! - Opaque storage locations pinning each object to the backend that holds it
//! - redb embedded database for metadata (ACID, MVCC, crash-safe)
//! - Bearer authentication via signed claim tokens or static API keys
//! - A background sweep that reclaims expired records and their blobs

pub mod api;
pub mod auth;
pub mod config;
pub mod gateway;
pub mod location;
pub mod object_store;
pub mod storage;
pub mod sweeper;

use std::sync::Arc;

use auth::AuthChain;
use config::Config;
use gateway::BlobGateway;
use storage::Database;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub gateway: Arc<BlobGateway>,
    pub auth: AuthChain,
}
