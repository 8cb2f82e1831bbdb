use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::db::models::{LessonVideoUpdate, UploadStatus, VideoStatus};
use crate::error::WebhookError;
use crate::mux::{preferred_playback_id, PlaybackId, UploadError};

pub const UPLOAD_ASSET_CREATED: &str = "video.upload.asset_created";
pub const UPLOAD_ERRORED: &str = "video.upload.errored";
pub const UPLOAD_CANCELLED: &str = "video.upload.cancelled";
pub const ASSET_READY: &str = "video.asset.ready";
pub const ASSET_ERRORED: &str = "video.asset.errored";

/// Outer webhook payload. Only `type` and `data` are interpreted.
#[derive(Debug, Clone, Deserialize)]
pub struct MuxEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl MuxEvent {
    pub fn parse(body: &[u8]) -> Result<Self, WebhookError> {
        serde_json::from_slice(body).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct AssetSettingsEcho {
    passthrough: Option<String>,
}

/// `data` of `video.upload.*` events: a Mux upload object.
#[derive(Debug, Deserialize)]
struct UploadData {
    id: String,
    asset_id: Option<String>,
    new_asset_settings: Option<AssetSettingsEcho>,
    error: Option<UploadError>,
}

/// `data` of `video.asset.*` events: a Mux asset object.
#[derive(Debug, Deserialize)]
struct AssetData {
    id: String,
    upload_id: Option<String>,
    passthrough: Option<String>,
    duration: Option<f64>,
    #[serde(default)]
    playback_ids: Vec<PlaybackId>,
}

/// How to find the lesson an event is about.
#[derive(Debug, Clone, PartialEq)]
pub enum LessonLookup {
    ById(Uuid),
    ByUploadId(String),
    ByAssetId(String),
}

/// Row changes derived from one webhook event. Lookups are tried in order.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookPlan {
    pub lookups: Vec<LessonLookup>,
    pub lesson_update: LessonVideoUpdate,
    pub video_status: Option<(String, VideoStatus)>,
}

fn lesson_id_from_passthrough(passthrough: Option<&str>) -> Option<Uuid> {
    let raw = passthrough?.trim();
    match Uuid::parse_str(raw) {
        Ok(id) => Some(id),
        Err(_) => {
            warn!("Ignoring non-lesson passthrough value: {}", raw);
            None
        }
    }
}

fn data<T: for<'de> Deserialize<'de>>(event: &MuxEvent) -> Result<T, WebhookError> {
    serde_json::from_value(event.data.clone())
        .map_err(|e| WebhookError::InvalidPayload(format!("{} data: {}", event.kind, e)))
}

/// Maps an event to the lesson/video updates it implies. Unknown events yield `None`.
pub fn plan(event: &MuxEvent) -> Result<Option<WebhookPlan>, WebhookError> {
    match event.kind.as_str() {
        UPLOAD_ASSET_CREATED => {
            let upload: UploadData = data(event)?;
            let passthrough = upload.new_asset_settings.as_ref().and_then(|s| s.passthrough.as_deref());

            let mut lookups = Vec::new();
            if let Some(id) = lesson_id_from_passthrough(passthrough) {
                lookups.push(LessonLookup::ById(id));
            }
            lookups.push(LessonLookup::ByUploadId(upload.id.clone()));

            Ok(Some(WebhookPlan {
                lookups,
                lesson_update: LessonVideoUpdate {
                    mux_upload_id: Some(upload.id),
                    mux_asset_id: upload.asset_id,
                    upload_status: Some(UploadStatus::Processing),
                    ..Default::default()
                },
                video_status: None,
            }))
        }
        UPLOAD_ERRORED | UPLOAD_CANCELLED => {
            let upload: UploadData = data(event)?;
            if let Some(err) = &upload.error {
                warn!(
                    "Upload {} failed: {}",
                    upload.id,
                    err.message.as_deref().unwrap_or("no message")
                );
            }
            let passthrough = upload.new_asset_settings.as_ref().and_then(|s| s.passthrough.as_deref());

            let mut lookups = Vec::new();
            if let Some(id) = lesson_id_from_passthrough(passthrough) {
                lookups.push(LessonLookup::ById(id));
            }
            lookups.push(LessonLookup::ByUploadId(upload.id));

            Ok(Some(WebhookPlan {
                lookups,
                lesson_update: LessonVideoUpdate {
                    upload_status: Some(UploadStatus::Error),
                    ..Default::default()
                },
                video_status: None,
            }))
        }
        ASSET_READY | ASSET_ERRORED => {
            let asset: AssetData = data(event)?;
            let ready = event.kind == ASSET_READY;

            let mut lookups = vec![LessonLookup::ByAssetId(asset.id.clone())];
            if let Some(upload_id) = asset.upload_id.clone() {
                lookups.push(LessonLookup::ByUploadId(upload_id));
            }
            if let Some(id) = lesson_id_from_passthrough(asset.passthrough.as_deref()) {
                lookups.push(LessonLookup::ById(id));
            }

            let lesson_update = if ready {
                LessonVideoUpdate {
                    mux_asset_id: Some(asset.id.clone()),
                    mux_playback_id: preferred_playback_id(&asset.playback_ids).map(str::to_string),
                    upload_status: Some(UploadStatus::Ready),
                    video_duration: asset.duration.map(|d| d.round() as i32),
                    ..Default::default()
                }
            } else {
                LessonVideoUpdate {
                    mux_asset_id: Some(asset.id.clone()),
                    upload_status: Some(UploadStatus::Error),
                    ..Default::default()
                }
            };

            let video_status = if ready { VideoStatus::Ready } else { VideoStatus::Error };

            Ok(Some(WebhookPlan {
                lookups,
                lesson_update,
                video_status: Some((asset.id, video_status)),
            }))
        }
        _ => Ok(None),
    }
}
