use chrono::{DateTime, Utc};
use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::{FileRecord, FileUpdate};
use super::repo::MetadataStore;
use super::tables::*;

/// Stable listing order: newest upload first, ties broken by id so equal
/// timestamps cannot shuffle between pages.
fn page(mut records: Vec<FileRecord>, limit: u32, offset: u32) -> Vec<FileRecord> {
    records.sort_by(|a, b| {
        b.uploaded_at
            .cmp(&a.uploaded_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    records
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect()
}

impl Database {
    /// Full-table scan keeping records matched by `keep`. The record set is
    /// an embedded table, not a SQL engine; filters run in process.
    fn scan_records<F>(&self, mut keep: F) -> Result<Vec<FileRecord>, DatabaseError>
    where
        F: FnMut(&FileRecord) -> bool,
    {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(FILES)?;

        let mut records = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let record: FileRecord = rmp_serde::from_slice(value.value())?;
            if keep(&record) {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Fetch all records for an owner through the secondary index.
    fn records_for_owner(&self, owner_id: &str) -> Result<Vec<FileRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let owner_table = read_txn.open_table(OWNER_FILES)?;
        let files_table = read_txn.open_table(FILES)?;

        let ids: Vec<String> = match owner_table.get(owner_id)? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(Vec::new()),
        };

        let mut records = Vec::new();
        for id in ids {
            if let Some(data) = files_table.get(id.as_str())? {
                let record: FileRecord = rmp_serde::from_slice(data.value())?;
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Load-mutate-store under a single write transaction. Returns false when
    /// the id is unknown.
    fn modify_record<F>(&self, id: &str, mutate: F) -> Result<bool, DatabaseError>
    where
        F: FnOnce(&FileRecord) -> FileRecord,
    {
        let write_txn = self.begin_write()?;

        let existing = {
            let table = write_txn.open_table(FILES)?;
            let result = match table.get(id)? {
                Some(data) => Some(rmp_serde::from_slice::<FileRecord>(data.value())?),
                None => None,
            };
            result
        };

        let updated = match existing {
            Some(record) => {
                let next = mutate(&record);
                let data = rmp_serde::to_vec_named(&next)?;
                let mut table = write_txn.open_table(FILES)?;
                table.insert(id, data.as_slice())?;
                true
            }
            None => false,
        };

        write_txn.commit()?;
        Ok(updated)
    }
}

impl MetadataStore for Database {
    /// Store a record and register it in the owner index
    fn insert_record(&self, record: &FileRecord) -> Result<(), DatabaseError> {
        debug_assert!(!record.id.is_empty(), "record id must not be empty");
        debug_assert!(!record.owner_id.is_empty(), "record owner must not be empty");

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(FILES)?;
            let data = rmp_serde::to_vec_named(record)?;
            table.insert(record.id.as_str(), data.as_slice())?;

            let mut owner_table = write_txn.open_table(OWNER_FILES)?;
            let mut ids: Vec<String> = owner_table
                .get(record.owner_id.as_str())?
                .map(|v| rmp_serde::from_slice(v.value()).unwrap_or_default())
                .unwrap_or_default();

            if !ids.contains(&record.id) {
                ids.push(record.id.clone());
                let index_data = rmp_serde::to_vec_named(&ids)?;
                owner_table.insert(record.owner_id.as_str(), index_data.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn update_record(&self, id: &str, update: &FileUpdate) -> Result<bool, DatabaseError> {
        self.modify_record(id, |record| record.apply(update))
    }

    fn find_by_id(&self, id: &str) -> Result<Option<FileRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(FILES)?;

        match table.get(id)? {
            Some(data) => {
                let record: FileRecord = rmp_serde::from_slice(data.value())?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Remove a record and clean up the owner index
    fn delete_record(&self, id: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let owner_id: Option<String> = {
            let table = write_txn.open_table(FILES)?;
            let result = match table.get(id)? {
                Some(data) => {
                    let record: FileRecord = rmp_serde::from_slice(data.value())?;
                    Some(record.owner_id)
                }
                None => None,
            };
            result
        };

        let deleted = match owner_id {
            Some(owner_id) => {
                {
                    let mut table = write_txn.open_table(FILES)?;
                    table.remove(id)?;
                }

                let ids: Option<Vec<String>> = {
                    let owner_table = write_txn.open_table(OWNER_FILES)?;
                    let result = owner_table.get(owner_id.as_str())?;
                    match result {
                        Some(data) => Some(rmp_serde::from_slice(data.value())?),
                        None => None,
                    }
                };

                if let Some(mut ids) = ids {
                    ids.retain(|fid| fid != id);
                    let mut owner_table = write_txn.open_table(OWNER_FILES)?;
                    if ids.is_empty() {
                        owner_table.remove(owner_id.as_str())?;
                    } else {
                        let data = rmp_serde::to_vec_named(&ids)?;
                        owner_table.insert(owner_id.as_str(), data.as_slice())?;
                    }
                }
                true
            }
            None => false,
        };

        write_txn.commit()?;
        Ok(deleted)
    }

    fn find_by_owner(
        &self,
        owner_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<FileRecord>, DatabaseError> {
        Ok(page(self.records_for_owner(owner_id)?, limit, offset))
    }

    fn find_by_mime_type(
        &self,
        mime_type: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<FileRecord>, DatabaseError> {
        let matched = self.scan_records(|r| r.mime_type == mime_type)?;
        Ok(page(matched, limit, offset))
    }

    fn search_by_name(
        &self,
        fragment: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<FileRecord>, DatabaseError> {
        let matched = self.scan_records(|r| r.original_name.contains(fragment))?;
        Ok(page(matched, limit, offset))
    }

    fn search_by_tags(
        &self,
        fragment: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<FileRecord>, DatabaseError> {
        let matched =
            self.scan_records(|r| r.tags.as_deref().is_some_and(|t| t.contains(fragment)))?;
        Ok(page(matched, limit, offset))
    }

    fn find_public(&self, limit: u32, offset: u32) -> Result<Vec<FileRecord>, DatabaseError> {
        let matched = self.scan_records(|r| r.is_public)?;
        Ok(page(matched, limit, offset))
    }

    fn find_expired(&self, as_of: DateTime<Utc>) -> Result<Vec<FileRecord>, DatabaseError> {
        self.scan_records(|r| r.is_expired_at(as_of))
    }

    fn update_expiration(
        &self,
        id: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<bool, DatabaseError> {
        self.modify_record(id, |record| {
            let mut next = record.clone();
            next.expires_at = expires_at;
            next
        })
    }

    fn update_last_accessed(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        self.modify_record(id, |record| {
            let mut next = record.clone();
            next.last_accessed_at = at;
            next
        })
    }

    fn count_by_owner(&self, owner_id: &str) -> Result<u64, DatabaseError> {
        let read_txn = self.begin_read()?;
        let owner_table = read_txn.open_table(OWNER_FILES)?;

        let count = match owner_table.get(owner_id)? {
            Some(data) => rmp_serde::from_slice::<Vec<String>>(data.value())?.len(),
            None => 0,
        };
        Ok(count as u64)
    }

    fn total_bytes_by_owner(&self, owner_id: &str) -> Result<u64, DatabaseError> {
        let records = self.records_for_owner(owner_id)?;
        Ok(records.iter().map(|r| r.size_bytes).sum())
    }

    fn count_by_mime_type(&self, mime_type: &str) -> Result<u64, DatabaseError> {
        Ok(self.scan_records(|r| r.mime_type == mime_type)?.len() as u64)
    }

    fn count_public(&self) -> Result<u64, DatabaseError> {
        Ok(self.scan_records(|r| r.is_public)?.len() as u64)
    }

    fn count_all(&self) -> Result<u64, DatabaseError> {
        Ok(self.scan_records(|_| true)?.len() as u64)
    }

    fn total_bytes(&self) -> Result<u64, DatabaseError> {
        let records = self.scan_records(|_| true)?;
        Ok(records.iter().map(|r| r.size_bytes).sum())
    }
}
