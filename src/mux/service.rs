use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use super::{simulate, Asset, CreateUploadRequest, MuxClient, NewAssetSettings, Upload, UploadStatusView};
use crate::config::MuxConfig;
use crate::error::AppError;
use crate::Result;

/// Upload details handed to the browser, which PUTs the file straight to `url`.
#[derive(Debug, Clone, Serialize)]
pub struct UploadTicket {
    pub upload_id: String,
    pub url: Option<String>,
    pub status: String,
    pub simulated: bool,
}

impl UploadTicket {
    fn from_upload(upload: Upload, simulated: bool) -> Self {
        Self {
            upload_id: upload.id,
            url: upload.url,
            status: upload.status,
            simulated,
        }
    }
}

pub struct VideoService {
    client: Option<MuxClient>,
    config: MuxConfig,
}

impl VideoService {
    pub fn from_config(config: &MuxConfig) -> Result<Self> {
        let client = match config.credentials() {
            Some((token_id, token_secret)) => {
                info!("Mux initialized with token {}...", token_id.chars().take(8).collect::<String>());
                Some(MuxClient::new(
                    &config.base_url,
                    token_id,
                    token_secret,
                    Duration::from_secs(config.request_timeout_secs),
                )?)
            }
            None => {
                warn!("Mux credentials not provided, video uploads will be simulated");
                None
            }
        };

        Ok(Self { client, config: config.clone() })
    }

    /// True when real Mux credentials are configured.
    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    fn upload_request(&self, cors_origin: Option<&str>, passthrough: Option<String>) -> CreateUploadRequest {
        CreateUploadRequest {
            cors_origin: cors_origin
                .filter(|origin| !origin.trim().is_empty())
                .unwrap_or(&self.config.default_cors_origin)
                .to_string(),
            new_asset_settings: NewAssetSettings {
                playback_policy: vec![self.config.playback_policy.clone()],
                encoding_tier: self.config.encoding_tier.clone(),
                max_resolution_tier: self.config.max_resolution_tier.clone(),
                passthrough,
            },
        }
    }

    pub async fn create_upload(
        &self,
        cors_origin: Option<&str>,
        passthrough: Option<String>,
    ) -> Result<UploadTicket> {
        let request = self.upload_request(cors_origin, passthrough);

        let Some(client) = &self.client else {
            warn!("Simulating Mux upload URL (no credentials provided)");
            return Ok(self.simulated_ticket(&request));
        };

        match client.create_direct_upload(&request).await {
            Ok(upload) => {
                info!("Created Mux direct upload {}", upload.id);
                Ok(UploadTicket::from_upload(upload, false))
            }
            Err(e) if self.config.fallback_to_simulation => {
                warn!("Mux upload creation failed, falling back to simulation mode: {}", e);
                Ok(self.simulated_ticket(&request))
            }
            Err(e) => Err(AppError::MuxError(e)),
        }
    }

    fn simulated_ticket(&self, request: &CreateUploadRequest) -> UploadTicket {
        let upload = simulate::upload(&self.config.simulated_upload_url, &request.cors_origin);
        UploadTicket::from_upload(upload, true)
    }

    pub async fn upload_status(&self, upload_id: &str) -> Result<UploadStatusView> {
        match &self.client {
            Some(client) if !simulate::is_simulated_upload(upload_id) => {
                Ok(client.get_upload(upload_id).await?.into())
            }
            _ => Ok(simulate::upload_status(upload_id)),
        }
    }

    pub async fn asset(&self, asset_id: &str) -> Result<Asset> {
        match &self.client {
            Some(client) if !simulate::is_simulated_asset(asset_id) => {
                Ok(client.get_asset(asset_id).await?)
            }
            _ => Ok(simulate::asset(asset_id)),
        }
    }
}
