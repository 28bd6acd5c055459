//! HTTP handlers for the file-metadata lifecycle.
//!
//! Delegates payload storage to the `StorageGateway` and record keeping to
//! `FileStore`; each handler is a single-shot request/response operation.

use crate::{errors::AppError, models::file::NewFileRecord, state::AppState};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

/// Maximum accepted upload size, enforced at the transport boundary.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// `POST /api/file/upload` — multipart upload, field `file`.
///
/// Forwards the payload to the gateway, persists a record from the
/// gateway's key/URL plus caller-supplied mimetype/filename, then re-fetches
/// the record by key and returns it. A successful gateway write followed by
/// a failed insert is not rolled back; the orphaned object is left behind.
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut upload: Option<(Bytes, String, String)> = None;

    // A multipart read failure here includes the body-limit trip; that is a
    // transport-level error, not a contract violation, and surfaces as 500.
    while let Some(field) = multipart.next_field().await.map_err(|err| {
        error!("failed to read multipart field: {}", err);
        AppError::internal(err.to_string())
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let mimetype = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let filename = field.file_name().unwrap_or("unnamed").to_string();
        let data = field.bytes().await.map_err(|err| {
            error!("failed to read file bytes: {}", err);
            AppError::internal(err.to_string())
        })?;

        upload = Some((data, filename, mimetype));
    }

    let Some((data, file_name, file_mimetype)) = upload else {
        return Err(AppError::no_file_uploaded());
    };

    let stored = state
        .gateway
        .put(data, &file_name, &file_mimetype)
        .await
        .map_err(|err| {
            error!("gateway upload failed: {}", err);
            AppError::from(err)
        })?;

    state
        .store
        .create(NewFileRecord {
            file_key: stored.key.clone(),
            file_mimetype,
            file_name,
            file_location: stored.url,
        })
        .await?;

    // Return the row as persisted rather than the in-memory value.
    let saved = state
        .store
        .find_by_key(&stored.key)
        .await
        .map_err(AppError::bad_request)?;

    Ok(Json(saved).into_response())
}

/// `GET /api/file/{id}` — fetch a record and the underlying object bytes.
///
/// The `Content-Type` header is set to the record's mimetype; the body is
/// `{"file": record, "data": <base64 bytes>}`. The gateway is only
/// contacted once the record lookup has succeeded.
pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let record = state.store.find_by_id(id).await?;

    let data = state.gateway.get(&record.file_key).await.map_err(|err| {
        error!("gateway retrieval failed for key {}: {}", record.file_key, err);
        AppError::from(err)
    })?;

    let content_type = HeaderValue::from_str(&record.file_mimetype)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    let body = json!({
        "file": record,
        "data": general_purpose::STANDARD.encode(&data),
    });

    let mut response = (StatusCode::OK, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, content_type);
    Ok(response)
}

/// `DELETE /api/file/` — purge every metadata record.
///
/// Objects already stored at the gateway are deliberately untouched.
pub async fn delete_all_files(State(state): State<AppState>) -> Result<Response, AppError> {
    state
        .store
        .delete_all()
        .await
        .map_err(AppError::bad_request)?;

    Ok(Json("All files deleted").into_response())
}
