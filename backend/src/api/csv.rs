//! CSV management routes.
//!
//! Store calls run on the blocking pool.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use super::logs::log_info;
use super::server::AppState;
use super::types::{success, ServerError, ServerResult};
use crate::models::OfferKind;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/upload/{csv_type}", post(upload_csv))
        .route("/info/{csv_type}", get(csv_info))
        .route("/backups", get(list_backups))
        .route("/restore/{filename}", post(restore_backup))
}

fn csv_kind(csv_type: &str) -> ServerResult<OfferKind> {
    OfferKind::from_csv_type(csv_type).ok_or_else(|| {
        ServerError::bad_request(format!(
            "Unknown CSV type '{}', expected 'freight' or 'vehicle'",
            csv_type
        ))
    })
}

/// Replace a canonical CSV with the multipart field `file`.
async fn upload_csv(
    State(state): State<AppState>,
    Path(csv_type): Path<String>,
    mut multipart: Multipart,
) -> ServerResult<(StatusCode, Json<Value>)> {
    let kind = csv_kind(&csv_type)?;
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::bad_request(format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().map(|s| s.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ServerError::bad_request(format!("Read error: {}", e)))?;
            file_data = Some(bytes.to_vec());
        }
    }

    let bytes = file_data.ok_or_else(|| ServerError::bad_request("No file provided (multipart field 'file')"))?;

    log_info(format!(
        "📄 Upload for {} CSV: {} ({} bytes)",
        kind.csv_type(),
        file_name.as_deref().unwrap_or("unknown"),
        bytes.len()
    ));

    let outcome = state.with_store(move |store| store.upload(kind, &bytes)).await?;
    Ok((StatusCode::CREATED, success(outcome)))
}

async fn csv_info(
    State(state): State<AppState>,
    Path(csv_type): Path<String>,
) -> ServerResult<Json<Value>> {
    let kind = csv_kind(&csv_type)?;
    let info = state.with_store(move |store| store.info(kind)).await?;
    Ok(success(info))
}

async fn list_backups(State(state): State<AppState>) -> ServerResult<Json<Value>> {
    let backups = state.with_store(|store| store.backups()).await?;
    Ok(Json(json!({
        "success": true,
        "count": backups.len(),
        "data": backups,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}

async fn restore_backup(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ServerResult<Json<Value>> {
    let outcome = state.with_store(move |store| store.restore(&filename)).await?;
    Ok(success(outcome))
}
