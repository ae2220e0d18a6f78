mod files;
mod health;
mod metadata;

pub use files::{delete_file, download_file, upload_file};
pub use health::health;
pub use metadata::{
    get_metadata, list_my_files, list_public_files, search_files, storage_stats, update_metadata,
};

use serde::Serialize;

use crate::api::response::ApiError;
use crate::gateway::GatewayError;
use crate::storage::models::FileRecord;

/// Map a gateway failure to the boundary response
fn gateway_error(e: GatewayError) -> ApiError {
    match e {
        GatewayError::NotFound(_) => ApiError::not_found("File content not found"),
        GatewayError::SizeUnknown => {
            ApiError::length_required("Upload size could not be determined")
        }
        // A location we wrote ourselves failed to decode -- that is corrupt
        // index state, not a client problem.
        GatewayError::MalformedLocation(e) => ApiError::internal(e.to_string()),
        GatewayError::Unreachable(msg) => {
            ApiError::unavailable(format!("Storage backend unavailable: {msg}"))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FileMetadataResponse {
    pub id: String,
    pub original_name: String,
    pub stored_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub checksum: Option<String>,
    pub location: String,
    pub owner_id: String,
    pub uploaded_at: String,
    pub last_accessed_at: String,
    pub expires_at: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub is_public: bool,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub schema_version: String,
}

fn record_to_response(record: &FileRecord) -> FileMetadataResponse {
    FileMetadataResponse {
        id: record.id.clone(),
        original_name: record.original_name.clone(),
        stored_name: record.stored_name.clone(),
        mime_type: record.mime_type.clone(),
        size_bytes: record.size_bytes,
        checksum: record.checksum.clone(),
        location: record.location.clone(),
        owner_id: record.owner_id.clone(),
        uploaded_at: record.uploaded_at.to_rfc3339(),
        last_accessed_at: record.last_accessed_at.to_rfc3339(),
        expires_at: record.expires_at.map(|t| t.to_rfc3339()),
        description: record.description.clone(),
        tags: record.tags.clone(),
        is_public: record.is_public,
        content_encoding: record.content_encoding.clone(),
        content_language: record.content_language.clone(),
        schema_version: record.schema_version.clone(),
    }
}
