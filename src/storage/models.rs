use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema version stamped into every new record.
pub const SCHEMA_VERSION: &str = "1.0";

/// Three-state patch value for partial updates that survives serialization
/// round-trips. Unlike `Option<Option<T>>`, each variant has a distinct wire
/// representation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Patch<T> {
    /// Field was not included in the request (no change).
    #[default]
    Absent,
    /// Field was explicitly set to null (clear it).
    Null,
    /// Field was set to a new value.
    Value(T),
}

impl<T> From<Option<Option<T>>> for Patch<T> {
    fn from(v: Option<Option<T>>) -> Self {
        match v {
            None => Patch::Absent,
            Some(None) => Patch::Null,
            Some(Some(v)) => Patch::Value(v),
        }
    }
}

impl<T> Patch<T> {
    /// Resolve against the current value: absent keeps it, null clears it.
    pub fn resolve(&self, current: Option<T>) -> Option<T>
    where
        T: Clone,
    {
        match self {
            Patch::Absent => current,
            Patch::Null => None,
            Patch::Value(v) => Some(v.clone()),
        }
    }
}

/// A file metadata record stored in redb.
///
/// `id`, `owner_id`, `location`, `size_bytes`, `stored_name`, `checksum`, and
/// `uploaded_at` are write-once: [`FileUpdate`] carries no such fields, so
/// nothing downstream of insertion can touch them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub original_name: String,
    /// Backend key, derived as `<id>_<original_name>` so concurrent uploads
    /// of the same filename never collide.
    pub stored_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    #[serde(default)]
    pub checksum: Option<String>,
    /// Opaque storage location; the sole pointer into the byte-storage layer.
    pub location: String,
    pub owner_id: String,
    pub uploaded_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: Option<String>,
    /// Free-form comma-separated labels, matched by substring in searches.
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub content_encoding: Option<String>,
    #[serde(default)]
    pub content_language: Option<String>,
    pub schema_version: String,
}

impl FileRecord {
    /// Backend key for a record: unique per upload even for repeated names.
    pub fn stored_name_for(id: &str, original_name: &str) -> String {
        format!("{id}_{original_name}")
    }

    /// Expired records stay queryable until the sweeper reclaims them.
    pub fn is_expired_at(&self, as_of: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(t) if t < as_of)
    }

    /// Copy-with-changes over the mutable subset. `stored_name` stays pinned
    /// to the uploaded backend key even when `original_name` changes.
    pub fn apply(&self, update: &FileUpdate) -> FileRecord {
        let mut next = self.clone();
        if let Some(ref name) = update.original_name {
            next.original_name = name.clone();
        }
        if let Some(ref mime) = update.mime_type {
            next.mime_type = mime.clone();
        }
        next.description = update.description.resolve(next.description);
        next.tags = update.tags.resolve(next.tags);
        if let Some(public) = update.is_public {
            next.is_public = public;
        }
        next
    }
}

/// Owner-editable subset of a file record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileUpdate {
    #[serde(default)]
    pub original_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub tags: Patch<String>,
    #[serde(default)]
    pub is_public: Option<bool>,
}
