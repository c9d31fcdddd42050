//! Request handlers.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::output::{AnalysisReport, UploadedDocument};
use crate::pipeline::classify;
use crate::progress::TracingObserver;
use crate::server::error::{ServerError, ServerResult};
use crate::server::state::AppState;
use axum::extract::multipart::MultipartError;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use bytes::BytesMut;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Multipart field carrying the document.
pub const UPLOAD_FIELD: &str = "cv";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: &'static str,
    pub data: AnalysisReport,
}

/// `POST /api/upload`
pub async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ServerResult<Json<UploadResponse>> {
    // Not multipart at all, or no usable boundary.
    let mut multipart = multipart.map_err(|e| ServerError::BadMultipart(e.body_text()))?;
    let doc = read_document(&mut multipart, state.pipeline.config()).await?;
    info!(
        "File received: {} ({} bytes, {})",
        doc.filename(),
        doc.len(),
        doc.mime_type()
    );

    let report = state.pipeline.run(&doc, &TracingObserver).await?;
    Ok(Json(UploadResponse {
        success: true,
        message: "File processed successfully",
        data: report,
    }))
}

/// Pull the `cv` field out of the form, enforcing the type allow-list up
/// front and the size ceiling while the body streams in.
async fn read_document(
    multipart: &mut Multipart,
    config: &PipelineConfig,
) -> ServerResult<UploadedDocument> {
    let limit = config.max_file_size;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            debug!("Ignoring multipart field {:?}", field.name());
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let mime = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        // Wrong type: reject before reading any of the payload.
        classify::classify(&mime, 0, config)?;

        let mut buf = BytesMut::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error(e, limit))?
        {
            let size = buf.len() + chunk.len();
            classify::check_size(size, limit)?;
            buf.extend_from_slice(&chunk);
        }
        return Ok(UploadedDocument::new(filename, mime, buf.freeze()));
    }

    Err(ServerError::NoFile)
}

fn multipart_error(e: MultipartError, limit: usize) -> ServerError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        // Body limit tripped before the field finished; exact size unknown.
        return PipelineError::TooLarge {
            size: limit.saturating_add(1),
            limit,
        }
        .into();
    }
    ServerError::BadMultipart(e.body_text())
}

/// `GET /api/health`
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "CV Analyzer API is running",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

/// `GET /api/test`
pub async fn test_route() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Test Endpoint",
            "description": "This is a test route",
        },
    }))
}

/// `GET /api/error`: always 500, for exercising client error handling.
pub async fn error_route() -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "success": false,
            "error": "This is a test error",
        })),
    )
}

pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
