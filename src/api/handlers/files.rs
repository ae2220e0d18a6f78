use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use super::{gateway_error, record_to_response, FileMetadataResponse};
use crate::api::response::{ApiError, JSend};
use crate::auth::AuthPrincipal;
use crate::object_store::stream_from_bytes;
use crate::storage::models::{FileRecord, SCHEMA_VERSION};
use crate::storage::MetadataStore;
use crate::AppState;

// ============================================================================
// Handlers
// ============================================================================

pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    AuthPrincipal(principal): AuthPrincipal,
    mut multipart: Multipart,
) -> Result<Json<JSend<FileMetadataResponse>>, ApiError> {
    let mut file_data: Option<Bytes> = None;
    let mut file_name: Option<String> = None;
    let mut file_content_type: Option<String> = None;
    let mut description: Option<String> = None;
    let mut tags: Option<String> = None;
    let mut is_public = false;
    let mut expires_at: Option<DateTime<Utc>> = None;
    let mut content_encoding: Option<String> = None;
    let mut content_language: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                file_content_type = field.content_type().map(|s| s.to_string());

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;

                if data.len() as u64 > state.config.max_upload_size {
                    return Err(ApiError::payload_too_large(format!(
                        "File exceeds maximum upload size of {} bytes",
                        state.config.max_upload_size
                    )));
                }

                file_data = Some(data);
            }
            "description" => {
                description = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Invalid description: {e}")))?,
                );
            }
            "tags" => {
                tags = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Invalid tags: {e}")))?,
                );
            }
            "is_public" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Invalid is_public: {e}")))?;
                is_public = text == "true" || text == "1";
            }
            "expires_at" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Invalid expires_at: {e}")))?;
                let parsed = DateTime::parse_from_rfc3339(&text).map_err(|e| {
                    ApiError::bad_request(format!("expires_at must be RFC 3339: {e}"))
                })?;
                expires_at = Some(parsed.with_timezone(&Utc));
            }
            "content_encoding" => {
                content_encoding = Some(field.text().await.map_err(|e| {
                    ApiError::bad_request(format!("Invalid content_encoding: {e}"))
                })?);
            }
            "content_language" => {
                content_language = Some(field.text().await.map_err(|e| {
                    ApiError::bad_request(format!("Invalid content_language: {e}"))
                })?);
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let file_data = file_data.ok_or_else(|| ApiError::bad_request("file field is required"))?;
    let original_name = file_name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("file field must carry a filename"))?;

    // Determine MIME type: from multipart Content-Type, or guess from filename, or fallback
    let mime_type = file_content_type
        .filter(|ct| ct != "application/octet-stream")
        .or_else(|| {
            mime_guess::from_path(&original_name)
                .first()
                .map(|m| m.to_string())
        })
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let id = uuid::Uuid::new_v4().to_string();
    let stored_name = FileRecord::stored_name_for(&id, &original_name);
    let size_bytes = file_data.len() as u64;
    let checksum = sha256_hex(&file_data);
    let now = Utc::now();

    // Phase 1: bytes to the preferred backend; the returned location pins
    // the object to it for the rest of its life.
    let location = state
        .gateway
        .upload(&stored_name, stream_from_bytes(file_data), Some(size_bytes))
        .await
        .map_err(gateway_error)?;

    // Phase 2: index the blob. The window between the two phases is the
    // documented orphaned-blob gap, so the insert happens immediately.
    let record = FileRecord {
        id: id.clone(),
        original_name,
        stored_name,
        mime_type,
        size_bytes,
        checksum: Some(checksum),
        location: location.encode(),
        owner_id: principal.name.clone(),
        uploaded_at: now,
        last_accessed_at: now,
        expires_at,
        description,
        tags,
        is_public,
        content_encoding,
        content_language,
        schema_version: SCHEMA_VERSION.to_string(),
    };

    if let Err(e) = state.db.insert_record(&record) {
        // Best-effort cleanup of the uploaded blob
        if let Err(cleanup) = state.gateway.delete(&record.location).await {
            tracing::warn!(
                file_id = %record.id,
                error = %cleanup,
                "Failed to clean up blob after index failure"
            );
        }
        return Err(ApiError::internal(e.to_string()));
    }

    tracing::debug!(file_id = %id, owner = %record.owner_id, "Uploaded file");

    Ok(JSend::success(record_to_response(&record)))
}

pub async fn download_file(
    State(state): State<Arc<AppState>>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let record = state
        .db
        .find_by_id(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    if !principal.can_read(&record) {
        return Err(ApiError::forbidden("Not permitted to read this file"));
    }

    let stream = state
        .gateway
        .download(&record.location)
        .await
        .map_err(gateway_error)?;

    // Advisory only -- a failed touch must not fail the read.
    if let Err(e) = state.db.update_last_accessed(&record.id, Utc::now()) {
        tracing::warn!(file_id = %record.id, error = %e, "Failed to update last-accessed time");
    }

    let mut response = (StatusCode::OK, Body::from_stream(stream)).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        record
            .mime_type
            .parse()
            .unwrap_or(header::HeaderValue::from_static("application/octet-stream")),
    );

    headers.insert(
        header::CONTENT_LENGTH,
        header::HeaderValue::from(record.size_bytes),
    );

    if let Ok(value) = format!("attachment; filename=\"{}\"", record.original_name).parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok(response)
}

pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    let record = state
        .db
        .find_by_id(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    if !principal.can_modify(&record) {
        return Err(ApiError::forbidden("Not the owner of this file"));
    }

    // Blob first. If this fails the record still goes: a stranded blob is
    // reclaimable out of band, a stranded record would keep resurfacing in
    // listings for an object that no longer serves.
    if let Err(e) = state.gateway.delete(&record.location).await {
        tracing::warn!(file_id = %id, error = %e, "Failed to delete blob from storage backend");
    }

    state
        .db
        .delete_record(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    tracing::debug!(file_id = %id, "Deleted file");
    Ok(JSend::success(()))
}

// ============================================================================
// Helpers
// ============================================================================

fn sha256_hex(data: &[u8]) -> String {
    let digest = ring::digest::digest(&ring::digest::SHA256, data);
    digest.as_ref().iter().map(|b| format!("{b:02x}")).collect()
}
