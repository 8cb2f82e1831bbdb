//! Mux Video integration.
//!
//! [`MuxClient`] speaks the Mux REST API. [`VideoService`] sits in front of it
//! and substitutes simulated uploads and assets when no credentials are
//! configured (or, optionally, when the real API call fails).

mod client;
pub mod simulate;
mod service;

pub use client::MuxClient;
pub use service::{UploadTicket, VideoService};

use serde::{Deserialize, Serialize};

/// `{"data": ...}` wrapper Mux puts around every response body.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateUploadRequest {
    pub cors_origin: String,
    pub new_asset_settings: NewAssetSettings,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAssetSettings {
    pub playback_policy: Vec<String>,
    pub encoding_tier: String,
    pub max_resolution_tier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passthrough: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadError {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Upload {
    pub id: String,
    pub url: Option<String>,
    pub status: String,
    pub asset_id: Option<String>,
    pub error: Option<UploadError>,
    pub cors_origin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackId {
    pub id: String,
    pub policy: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub playback_ids: Vec<PlaybackId>,
    pub duration: Option<f64>,
    pub aspect_ratio: Option<String>,
    pub created_at: Option<String>,
}

/// What the upload status route reports back to the browser.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadStatusView {
    pub status: String,
    pub asset_id: Option<String>,
    pub error: Option<UploadError>,
}

impl From<Upload> for UploadStatusView {
    fn from(upload: Upload) -> Self {
        Self {
            status: upload.status,
            asset_id: upload.asset_id,
            error: upload.error,
        }
    }
}

/// The public playback id if there is one, otherwise the first listed.
pub fn preferred_playback_id(playback_ids: &[PlaybackId]) -> Option<&str> {
    playback_ids
        .iter()
        .find(|p| p.policy == "public")
        .or_else(|| playback_ids.first())
        .map(|p| p.id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: &str, policy: &str) -> PlaybackId {
        PlaybackId { id: id.to_string(), policy: policy.to_string() }
    }

    #[test]
    fn test_preferred_playback_id() {
        assert_eq!(preferred_playback_id(&[]), None);
        assert_eq!(preferred_playback_id(&[pid("s1", "signed")]), Some("s1"));
        assert_eq!(
            preferred_playback_id(&[pid("s1", "signed"), pid("p1", "public")]),
            Some("p1")
        );
    }

    #[test]
    fn test_upload_request_serialization() {
        let request = CreateUploadRequest {
            cors_origin: "http://localhost:5173".to_string(),
            new_asset_settings: NewAssetSettings {
                playback_policy: vec!["public".to_string()],
                encoding_tier: "baseline".to_string(),
                max_resolution_tier: "1080p".to_string(),
                passthrough: None,
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["cors_origin"], "http://localhost:5173");
        assert_eq!(json["new_asset_settings"]["playback_policy"][0], "public");
        assert!(json["new_asset_settings"].get("passthrough").is_none());
    }
}
