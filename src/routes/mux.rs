use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::db::models::{LessonVideoUpdate, UploadStatus};
use crate::error::AppError;
use crate::webhook::{self, signature, MuxEvent};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct UploadUrlRequest {
    pub lesson_id: Option<Uuid>,
    #[serde(alias = "corsOrigin")]
    pub cors_origin: Option<String>,
}

impl UploadUrlRequest {
    /// An empty body means "no lesson, default origin"; anything else must parse.
    fn from_body(body: &[u8]) -> Result<Self, AppError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| AppError::ValidationError(format!("Invalid upload request: {}", e)))
    }
}

pub async fn create_upload_url(
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let req = UploadUrlRequest::from_body(&body)?;
    info!("Creating upload URL (lesson: {:?})", req.lesson_id);

    let ticket = state
        .video
        .create_upload(req.cors_origin.as_deref(), req.lesson_id.map(|id| id.to_string()))
        .await?;

    if let Some(lesson_id) = req.lesson_id {
        let update = LessonVideoUpdate {
            mux_upload_id: Some(ticket.upload_id.clone()),
            upload_status: Some(UploadStatus::Uploading),
            ..Default::default()
        };
        match state.repo.update_lesson_video(lesson_id, &update).await {
            Ok(Some(_)) => info!("Lesson {} linked to upload {}", lesson_id, ticket.upload_id),
            Ok(None) => error!("Lesson {} not found while linking upload {}", lesson_id, ticket.upload_id),
            Err(e) => error!("Failed to update lesson {} with upload {}: {}", lesson_id, ticket.upload_id, e),
        }
    }

    Ok(HttpResponse::Ok().json(ticket))
}

pub async fn get_upload_status(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let status = state.video.upload_status(&path).await?;
    Ok(HttpResponse::Ok().json(status))
}

pub async fn get_asset(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let asset = state.video.asset(&path).await?;
    Ok(HttpResponse::Ok().json(asset))
}

/// Mux event receiver. The raw body is needed for signature verification.
pub async fn webhook(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let mux = &state.config.mux;
    if let Some(secret) = mux.webhook_secret.as_deref().filter(|s| !s.is_empty()) {
        let header = req
            .headers()
            .get(signature::HEADER)
            .and_then(|h| h.to_str().ok());
        signature::verify(
            header,
            &body,
            secret,
            mux.webhook_tolerance_secs,
            chrono::Utc::now().timestamp(),
        )?;
    }

    let event = MuxEvent::parse(&body)?;
    info!("Received Mux webhook: {}", event.kind);

    match webhook::plan(&event)? {
        Some(plan) => {
            let outcome = webhook::apply(state.repo.as_ref(), &event.kind, &plan).await?;
            info!(
                "Webhook {} applied (lesson: {:?}, videos: {})",
                event.kind, outcome.lesson_id, outcome.videos_updated
            );
        }
        None => info!("Ignoring unhandled webhook event: {}", event.kind),
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "received": true })))
}
