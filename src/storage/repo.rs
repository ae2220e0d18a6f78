use chrono::{DateTime, Utc};

use super::db::DatabaseError;
use super::models::{FileRecord, FileUpdate};

/// Convert a 1-based page number to a row offset.
pub fn page_offset(page: u32, limit: u32) -> u32 {
    page.saturating_sub(1).saturating_mul(limit)
}

/// Persistence contract for file metadata.
///
/// All listing operations share one total order: upload time descending,
/// ties broken by id ascending. Pagination is only correct against a stable
/// total order, so implementations must not reorder equal-timestamp rows
/// between calls.
pub trait MetadataStore {
    fn insert_record(&self, record: &FileRecord) -> Result<(), DatabaseError>;

    /// Apply the owner-editable subset; write-once fields are untouchable by
    /// construction. Returns false when the id is unknown.
    fn update_record(&self, id: &str, update: &FileUpdate) -> Result<bool, DatabaseError>;

    fn find_by_id(&self, id: &str) -> Result<Option<FileRecord>, DatabaseError>;

    fn delete_record(&self, id: &str) -> Result<bool, DatabaseError>;

    fn find_by_owner(
        &self,
        owner_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<FileRecord>, DatabaseError>;

    /// Exact MIME type match.
    fn find_by_mime_type(
        &self,
        mime_type: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<FileRecord>, DatabaseError>;

    /// Substring match on the original filename.
    fn search_by_name(
        &self,
        fragment: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<FileRecord>, DatabaseError>;

    /// Substring match on the tags field.
    fn search_by_tags(
        &self,
        fragment: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<FileRecord>, DatabaseError>;

    fn find_public(&self, limit: u32, offset: u32) -> Result<Vec<FileRecord>, DatabaseError>;

    /// Records whose `expires_at` is strictly before `as_of`. Null or future
    /// expirations never match.
    fn find_expired(&self, as_of: DateTime<Utc>) -> Result<Vec<FileRecord>, DatabaseError>;

    fn update_expiration(
        &self,
        id: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<bool, DatabaseError>;

    /// Advisory access-time bump; callers must not fail a read when this
    /// errors.
    fn update_last_accessed(&self, id: &str, at: DateTime<Utc>)
        -> Result<bool, DatabaseError>;

    fn count_by_owner(&self, owner_id: &str) -> Result<u64, DatabaseError>;
    fn total_bytes_by_owner(&self, owner_id: &str) -> Result<u64, DatabaseError>;
    fn count_by_mime_type(&self, mime_type: &str) -> Result<u64, DatabaseError>;
    fn count_public(&self) -> Result<u64, DatabaseError>;
    fn count_all(&self) -> Result<u64, DatabaseError>;
    fn total_bytes(&self) -> Result<u64, DatabaseError>;

    /// 1-based page wrapper over the offset primitive.
    fn find_by_owner_paginated(
        &self,
        owner_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<Vec<FileRecord>, DatabaseError> {
        self.find_by_owner(owner_id, limit, page_offset(page, limit))
    }
}
