use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use super::{record_to_response, FileMetadataResponse};
use crate::api::response::{ApiError, AppJson, AppQuery, JSend, JSendPaginated};
use crate::auth::AuthPrincipal;
use crate::storage::models::{FileUpdate, Patch};
use crate::storage::{page_offset, MetadataStore};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub mime: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateMetadataRequest {
    #[serde(default)]
    pub original_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub tags: Option<Option<String>>,
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub expires_at: Option<Option<DateTime<Utc>>>,

    // Write-once fields, accepted only so an explicit mutation attempt can
    // be answered with a conflict instead of being silently dropped.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub stored_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UsageStats {
    pub file_count: u64,
    pub total_bytes: u64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub owner: UsageStats,
    pub global: UsageStats,
    pub public_file_count: u64,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

/// Distinguishes between a missing field (`None`) and an explicit `null` (`Some(None)`).
fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: DeserializeOwned,
    D: Deserializer<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

fn check_page(page: u32, limit: u32) -> Result<(), ApiError> {
    if page == 0 {
        return Err(ApiError::bad_request("page numbers start at 1"));
    }
    if limit == 0 {
        return Err(ApiError::bad_request("limit must be greater than 0"));
    }
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn get_metadata(
    State(state): State<Arc<AppState>>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
) -> Result<Json<JSend<FileMetadataResponse>>, ApiError> {
    let record = state
        .db
        .find_by_id(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    if !principal.can_read(&record) {
        return Err(ApiError::forbidden("Not permitted to read this file"));
    }

    Ok(JSend::success(record_to_response(&record)))
}

pub async fn update_metadata(
    State(state): State<Arc<AppState>>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateMetadataRequest>,
) -> Result<Json<JSend<FileMetadataResponse>>, ApiError> {
    // Write-once fields are set at upload and never change.
    for (field, present) in [
        ("id", req.id.is_some()),
        ("owner_id", req.owner_id.is_some()),
        ("location", req.location.is_some()),
        ("size_bytes", req.size_bytes.is_some()),
        ("stored_name", req.stored_name.is_some()),
    ] {
        if present {
            return Err(ApiError::conflict(format!("{field} is write-once")));
        }
    }

    if req.original_name.is_none()
        && req.mime_type.is_none()
        && req.description.is_none()
        && req.tags.is_none()
        && req.is_public.is_none()
        && req.expires_at.is_none()
    {
        return Err(ApiError::bad_request(
            "at least one field (original_name, mime_type, description, tags, is_public, expires_at) must be provided",
        ));
    }

    if let Some(ref name) = req.original_name {
        if name.trim().is_empty() {
            return Err(ApiError::bad_request("original_name must not be empty"));
        }
    }
    if let Some(ref mime) = req.mime_type {
        if mime.trim().is_empty() {
            return Err(ApiError::bad_request("mime_type must not be empty"));
        }
    }

    let record = state
        .db
        .find_by_id(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    if !principal.can_modify(&record) {
        return Err(ApiError::forbidden("Not the owner of this file"));
    }

    let update = FileUpdate {
        original_name: req.original_name.clone(),
        mime_type: req.mime_type.clone(),
        description: Patch::from(req.description.clone()),
        tags: Patch::from(req.tags.clone()),
        is_public: req.is_public,
    };

    state
        .db
        .update_record(&id, &update)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    // Expiration edits ride the same request but hit the dedicated store
    // operation, keeping `update_record` to the five core mutable fields.
    if let Some(expires_at) = req.expires_at {
        state
            .db
            .update_expiration(&id, expires_at)
            .map_err(|e| ApiError::internal(e.to_string()))?;
    }

    let refreshed = state
        .db
        .find_by_id(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::internal("File not found after update"))?;

    tracing::debug!(file_id = %id, "Updated file metadata");
    Ok(JSend::success(record_to_response(&refreshed)))
}

pub async fn list_my_files(
    State(state): State<Arc<AppState>>,
    AuthPrincipal(principal): AuthPrincipal,
    AppQuery(params): AppQuery<PageParams>,
) -> Result<Json<JSendPaginated<FileMetadataResponse>>, ApiError> {
    check_page(params.page, params.limit)?;

    let records = state
        .db
        .find_by_owner_paginated(&principal.name, params.page, params.limit)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let items = records.iter().map(record_to_response).collect();
    Ok(JSendPaginated::success(items, params.page, params.limit))
}

pub async fn list_public_files(
    State(state): State<Arc<AppState>>,
    AuthPrincipal(_principal): AuthPrincipal,
    AppQuery(params): AppQuery<PageParams>,
) -> Result<Json<JSendPaginated<FileMetadataResponse>>, ApiError> {
    check_page(params.page, params.limit)?;

    let records = state
        .db
        .find_public(params.limit, page_offset(params.page, params.limit))
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let items = records.iter().map(record_to_response).collect();
    Ok(JSendPaginated::success(items, params.page, params.limit))
}

pub async fn search_files(
    State(state): State<Arc<AppState>>,
    AuthPrincipal(_principal): AuthPrincipal,
    AppQuery(params): AppQuery<SearchParams>,
) -> Result<Json<JSendPaginated<FileMetadataResponse>>, ApiError> {
    check_page(params.page, params.limit)?;

    let filters = [
        params.name.is_some(),
        params.tag.is_some(),
        params.mime.is_some(),
    ];
    if filters.iter().filter(|f| **f).count() != 1 {
        return Err(ApiError::bad_request(
            "exactly one of name, tag, mime must be provided",
        ));
    }

    let offset = page_offset(params.page, params.limit);
    let records = if let Some(ref name) = params.name {
        state.db.search_by_name(name, params.limit, offset)
    } else if let Some(ref tag) = params.tag {
        state.db.search_by_tags(tag, params.limit, offset)
    } else {
        let mime = params.mime.as_deref().unwrap_or_default();
        state.db.find_by_mime_type(mime, params.limit, offset)
    }
    .map_err(|e| ApiError::internal(e.to_string()))?;

    let items = records.iter().map(record_to_response).collect();
    Ok(JSendPaginated::success(items, params.page, params.limit))
}

pub async fn storage_stats(
    State(state): State<Arc<AppState>>,
    AuthPrincipal(principal): AuthPrincipal,
) -> Result<Json<JSend<StatsResponse>>, ApiError> {
    let stats = StatsResponse {
        owner: UsageStats {
            file_count: state
                .db
                .count_by_owner(&principal.name)
                .map_err(|e| ApiError::internal(e.to_string()))?,
            total_bytes: state
                .db
                .total_bytes_by_owner(&principal.name)
                .map_err(|e| ApiError::internal(e.to_string()))?,
        },
        global: UsageStats {
            file_count: state
                .db
                .count_all()
                .map_err(|e| ApiError::internal(e.to_string()))?,
            total_bytes: state
                .db
                .total_bytes()
                .map_err(|e| ApiError::internal(e.to_string()))?,
        },
        public_file_count: state
            .db
            .count_public()
            .map_err(|e| ApiError::internal(e.to_string()))?,
    };

    Ok(JSend::success(stats))
}
