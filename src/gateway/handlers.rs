use axum::{
    extract::{
        Multipart, Query, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::QueryRejection,
    },
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use uuid::Uuid;

use super::{AppState, IMAGE_FIELD};
use crate::error::{AuditError, CaptureError};
use crate::media::ImagePayload;

/// Screenshot query params
#[derive(Debug, Deserialize)]
pub struct ScreenshotQuery {
    pub url: Option<String>,
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

fn message_body(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "message": message }))).into_response()
}

/// GET /health: no secrets, just liveness and the active model
pub(super) async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "model": state.auditor.model(),
        "prompt_version": state.auditor.prompt_version(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Pull the image field out of the form. Other fields are skipped.
async fn read_image_field(multipart: &mut Multipart) -> Result<Option<ImagePayload>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        return Ok(Some(ImagePayload::from_upload(
            bytes.to_vec(),
            content_type.as_deref(),
            file_name.as_deref(),
        )));
    }
    Ok(None)
}

/// POST /api/analyze: multipart upload in, `AuditReport` JSON out
pub(super) async fn handle_analyze(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let request_id = Uuid::new_v4();

    let image = match multipart {
        Ok(mut multipart) => match read_image_field(&mut multipart).await {
            Ok(image) => image,
            Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                tracing::warn!(%request_id, "upload exceeded the body limit");
                return error_body(StatusCode::PAYLOAD_TOO_LARGE, "Uploaded file is too large");
            }
            Err(e) => {
                tracing::warn!(%request_id, error = %e, "unreadable multipart body");
                None
            }
        },
        Err(rejection) => {
            tracing::warn!(%request_id, error = %rejection, "request is not multipart");
            None
        }
    };

    if let Some(image) = &image {
        tracing::info!(
            %request_id,
            mime_type = image.mime_type(),
            bytes = image.len(),
            "Audit requested"
        );
    }

    match state.auditor.audit(image).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => {
            match &e {
                AuditError::MissingImage | AuditError::UnsupportedMediaType(_) => {
                    tracing::warn!(%request_id, kind = e.kind(), "Audit rejected: {e}");
                }
                AuditError::Provider(_) | AuditError::MalformedResponse(_) => {
                    tracing::error!(%request_id, kind = e.kind(), "Audit failed: {e}");
                }
            }
            error_body(e.status_code(), e.public_message())
        }
    }
}

/// GET /api/screenshot?url=...: raster bytes of the rendered page
pub(super) async fn handle_screenshot(
    State(state): State<AppState>,
    query: Result<Query<ScreenshotQuery>, QueryRejection>,
) -> Response {
    let request_id = Uuid::new_v4();

    let url = query
        .ok()
        .and_then(|Query(q)| q.url)
        .filter(|u| !u.trim().is_empty());
    let Some(url) = url else {
        return message_body(StatusCode::BAD_REQUEST, "URL is required");
    };

    tracing::info!(%request_id, url = url.as_str(), "Screenshot requested");

    match state.screenshots.capture(&url).await {
        Ok(image) => {
            let mime_type = image.mime_type().to_string();
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime_type),
                    (header::CACHE_CONTROL, "no-store".to_string()),
                ],
                image.into_bytes(),
            )
                .into_response()
        }
        Err(e) => {
            match &e {
                CaptureError::InvalidUrl(_) | CaptureError::Busy => {
                    tracing::warn!(%request_id, kind = e.kind(), "Screenshot rejected: {e}");
                }
                CaptureError::NavigationTimeout(_)
                | CaptureError::NavigationError(_)
                | CaptureError::RenderingContextError(_) => {
                    tracing::error!(%request_id, kind = e.kind(), "Screenshot failed: {e}");
                }
            }
            message_body(e.status_code(), e.public_message())
        }
    }
}
