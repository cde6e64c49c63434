use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::Json;
use base64::Engine;
use serde::Deserialize;
use tracing::{error, info};

use crate::error::{AppError, AppResult};
use crate::storage::Document;

use super::guard::SessionIdentity;
use super::horses::load_visible_horse;
use super::AppState;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Deserialize)]
pub struct UploadPayload {
    pub file_name: String,
    #[serde(default)]
    pub content_type: Option<String>,
    pub content_base64: String,
}

/// Keep only the final path component and drop characters unsafe in a header.
fn clean_file_name(raw: &str) -> String {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or("");
    last.chars()
        .filter(|c| !c.is_control() && *c != '"')
        .collect::<String>()
        .trim()
        .to_string()
}

pub async fn upload(
    State(state): State<AppState>,
    SessionIdentity(identity): SessionIdentity,
    Path(horse_id): Path<String>,
    Json(payload): Json<UploadPayload>,
) -> AppResult<(StatusCode, Json<Document>)> {
    let horse = load_visible_horse(&state, &identity, &horse_id)?;
    let file_name = clean_file_name(&payload.file_name);
    if file_name.is_empty() {
        return Err(AppError::user("invalid_file_name", "file_name is required"));
    }
    let content_type = payload
        .content_type
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty() && HeaderValue::from_str(s).is_ok())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.content_base64.trim())
        .map_err(|_| AppError::user("invalid_content", "content_base64 is not valid base64"))?;
    if bytes.is_empty() {
        return Err(AppError::user("empty_document", "document is empty"));
    }
    if bytes.len() > state.max_upload_bytes {
        return Err(AppError::too_large(
            "document_too_large".to_string(),
            format!("document exceeds {} bytes", state.max_upload_bytes),
        ));
    }

    let doc = state
        .store
        .0
        .lock()
        .create_document(&horse.id, &identity.subject_id, &file_name, &content_type, &bytes)?;
    info!(target: "vetsense::documents", "document uploaded id={} horse={} size={}", doc.id, doc.horse_id, doc.size_bytes);
    Ok((StatusCode::CREATED, Json(doc)))
}

pub async fn list(
    State(state): State<AppState>,
    SessionIdentity(identity): SessionIdentity,
    Path(horse_id): Path<String>,
) -> AppResult<Json<Vec<Document>>> {
    let horse = load_visible_horse(&state, &identity, &horse_id)?;
    let guard = state.store.0.lock();
    Ok(Json(guard.list_documents(&horse.id).into_iter().cloned().collect()))
}

pub async fn download(
    State(state): State<AppState>,
    SessionIdentity(identity): SessionIdentity,
    Path(id): Path<String>,
) -> AppResult<(HeaderMap, Vec<u8>)> {
    let doc = state
        .store
        .0
        .lock()
        .find_document(&id)
        .cloned()
        .ok_or_else(|| AppError::not_found("document_not_found", "document not found"))?;
    load_visible_horse(&state, &identity, &doc.horse_id)?;
    let bytes = state.store.0.lock().read_document_bytes(&doc.id).map_err(|e| {
        error!(target: "vetsense::documents", "document bytes unreadable id={}: {e:#}", doc.id);
        AppError::io("storage_unavailable", "document content is unavailable")
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&doc.content_type).unwrap_or(HeaderValue::from_static(DEFAULT_CONTENT_TYPE)),
    );
    let ascii_name: String = doc.file_name.chars().map(|c| if c.is_ascii() { c } else { '_' }).collect();
    let disposition = format!("attachment; filename=\"{ascii_name}\"");
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition).unwrap_or(HeaderValue::from_static("attachment")),
    );
    Ok((headers, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_lose_directories_and_quotes() {
        assert_eq!(clean_file_name("../../etc/passwd"), "passwd");
        assert_eq!(clean_file_name("C:\\scans\\xray \"left\".png"), "xray left.png");
        assert_eq!(clean_file_name("   "), "");
        assert_eq!(clean_file_name("dir/"), "");
    }
}
