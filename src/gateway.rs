use std::sync::Arc;

use thiserror::Error;

use crate::location::{LocationError, StorageLocation};
use crate::object_store::{ByteStream, ObjectStore, ObjectStoreError};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    MalformedLocation(#[from] LocationError),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Backend unreachable: {0}")]
    Unreachable(String),
    #[error("Backend requires a declared content length")]
    SizeUnknown,
}

impl GatewayError {
    fn from_store(e: ObjectStoreError) -> Self {
        match e {
            ObjectStoreError::NotFound(key) => GatewayError::NotFound(key),
            other => GatewayError::Unreachable(other.to_string()),
        }
    }
}

/// A remote object-store backend together with the bucket its locations
/// are qualified by.
pub struct ObjectBackend {
    pub bucket: String,
    pub store: Arc<dyn ObjectStore>,
}

/// Routes blob operations to the backend named by a storage location.
///
/// The backend for an object is chosen once, at upload time, and baked into
/// the returned location. Download/delete/exists always follow the recorded
/// location, never the currently preferred backend -- reconfiguring the
/// default must not strand previously uploaded objects.
pub struct BlobGateway {
    local: Arc<dyn ObjectStore>,
    object: Option<ObjectBackend>,
}

impl BlobGateway {
    pub fn new(local: Arc<dyn ObjectStore>, object: Option<ObjectBackend>) -> Self {
        Self { local, object }
    }

    /// Write `data` under `key` to the preferred backend and return the
    /// location that pins the object to it. The object store announces
    /// content length up front, so routing there without a size fails.
    pub async fn upload(
        &self,
        key: &str,
        data: ByteStream,
        size_hint: Option<u64>,
    ) -> Result<StorageLocation, GatewayError> {
        match &self.object {
            Some(backend) => {
                let len = size_hint.ok_or(GatewayError::SizeUnknown)?;
                backend
                    .store
                    .put(key, data, len)
                    .await
                    .map_err(GatewayError::from_store)?;
                Ok(StorageLocation::object(backend.bucket.clone(), key))
            }
            None => {
                self.local
                    .put(key, data, size_hint.unwrap_or(0))
                    .await
                    .map_err(GatewayError::from_store)?;
                Ok(StorageLocation::local(key))
            }
        }
    }

    pub async fn download(&self, location: &str) -> Result<ByteStream, GatewayError> {
        let decoded = StorageLocation::decode(location)?;
        let (store, key) = self.route(&decoded)?;
        store.get(key).await.map_err(GatewayError::from_store)
    }

    /// Idempotent: deleting an already-absent object succeeds.
    pub async fn delete(&self, location: &str) -> Result<(), GatewayError> {
        let decoded = StorageLocation::decode(location)?;
        let (store, key) = self.route(&decoded)?;
        store.delete(key).await.map_err(GatewayError::from_store)
    }

    /// Best-effort existence probe for advisory checks; decode failures and
    /// backend errors both read as absent.
    pub async fn exists(&self, location: &str) -> bool {
        let decoded = match StorageLocation::decode(location) {
            Ok(d) => d,
            Err(_) => return false,
        };
        let (store, key) = match self.route(&decoded) {
            Ok(r) => r,
            Err(_) => return false,
        };
        store.exists(key).await.unwrap_or(false)
    }

    fn route<'a>(
        &'a self,
        location: &'a StorageLocation,
    ) -> Result<(&'a dyn ObjectStore, &'a str), GatewayError> {
        match location {
            StorageLocation::Local { key } => Ok((self.local.as_ref(), key)),
            StorageLocation::Object { bucket, key } => match &self.object {
                Some(backend) if backend.bucket == *bucket => {
                    Ok((backend.store.as_ref(), key))
                }
                Some(backend) => Err(GatewayError::Unreachable(format!(
                    "no backend for bucket '{bucket}' (configured: '{}')",
                    backend.bucket
                ))),
                None => Err(GatewayError::Unreachable(format!(
                    "no object-store backend attached for bucket '{bucket}'"
                ))),
            },
        }
    }
}
