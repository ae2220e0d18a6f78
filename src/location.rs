use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Scheme prefix for blobs held by the local filesystem backend.
const LOCAL_SCHEME: &str = "local://";
/// Scheme prefix for blobs held by a remote object-store bucket.
const OBJECT_SCHEME: &str = "object://";

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Malformed storage location: {0}")]
    Malformed(String),
}

/// Which backend holds a blob, plus the backend-specific key.
///
/// The encoded form is the only thing persisted in a file record; picking the
/// wrong backend for a get/delete is a data-safety issue, so decoding an
/// unrecognized scheme is always an error and never falls back to a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    Local { key: String },
    Object { bucket: String, key: String },
}

impl StorageLocation {
    pub fn local(key: impl Into<String>) -> Self {
        StorageLocation::Local { key: key.into() }
    }

    pub fn object(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        StorageLocation::Object {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// The backend-specific key, independent of which backend holds it.
    pub fn key(&self) -> &str {
        match self {
            StorageLocation::Local { key } => key,
            StorageLocation::Object { key, .. } => key,
        }
    }

    /// Encode into the opaque string stored in the metadata record.
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Decode an opaque location string back into backend kind + key.
    pub fn decode(raw: &str) -> Result<Self, LocationError> {
        raw.parse()
    }
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageLocation::Local { key } => write!(f, "{LOCAL_SCHEME}{key}"),
            StorageLocation::Object { bucket, key } => {
                write!(f, "{OBJECT_SCHEME}{bucket}/{key}")
            }
        }
    }
}

impl FromStr for StorageLocation {
    type Err = LocationError;

    fn from_str(raw: &str) -> Result<Self, LocationError> {
        if let Some(key) = raw.strip_prefix(LOCAL_SCHEME) {
            if key.is_empty() {
                return Err(LocationError::Malformed(raw.to_string()));
            }
            return Ok(StorageLocation::Local {
                key: key.to_string(),
            });
        }

        if let Some(rest) = raw.strip_prefix(OBJECT_SCHEME) {
            let (bucket, key) = rest
                .split_once('/')
                .ok_or_else(|| LocationError::Malformed(raw.to_string()))?;
            if bucket.is_empty() || key.is_empty() {
                return Err(LocationError::Malformed(raw.to_string()));
            }
            return Ok(StorageLocation::Object {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }

        Err(LocationError::Malformed(raw.to_string()))
    }
}
