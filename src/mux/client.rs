use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, error};
use url::Url;

use super::{Asset, CreateUploadRequest, Envelope, Upload};
use crate::error::MuxError;

pub struct MuxClient {
    http: reqwest::Client,
    base_url: Url,
    token_id: String,
    token_secret: String,
}

impl MuxClient {
    pub fn new(
        base_url: &str,
        token_id: &str,
        token_secret: &str,
        timeout: Duration,
    ) -> Result<Self, MuxError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| MuxError::Request(format!("Invalid Mux base URL {}: {}", base_url, e)))?;

        if base_url.cannot_be_a_base() {
            return Err(MuxError::Request(format!("Mux base URL {} cannot be a base", base_url)));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MuxError::Request(format!("Failed to build Mux HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            token_id: token_id.to_string(),
            token_secret: token_secret.to_string(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub async fn create_direct_upload(&self, request: &CreateUploadRequest) -> Result<Upload, MuxError> {
        let url = self.endpoint(&["video", "v1", "uploads"]);
        debug!("Creating Mux direct upload for origin {}", request.cors_origin);

        let response = self
            .http
            .post(url)
            .basic_auth(&self.token_id, Some(&self.token_secret))
            .json(request)
            .send()
            .await
            .map_err(|e| MuxError::Request(e.to_string()))?;

        Self::read_data(response).await
    }

    pub async fn get_upload(&self, upload_id: &str) -> Result<Upload, MuxError> {
        let url = self.endpoint(&["video", "v1", "uploads", upload_id]);

        let response = self
            .http
            .get(url)
            .basic_auth(&self.token_id, Some(&self.token_secret))
            .send()
            .await
            .map_err(|e| MuxError::Request(e.to_string()))?;

        Self::read_data(response).await
    }

    pub async fn get_asset(&self, asset_id: &str) -> Result<Asset, MuxError> {
        let url = self.endpoint(&["video", "v1", "assets", asset_id]);

        let response = self
            .http
            .get(url)
            .basic_auth(&self.token_id, Some(&self.token_secret))
            .send()
            .await
            .map_err(|e| MuxError::Request(e.to_string()))?;

        Self::read_data(response).await
    }

    async fn read_data<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, MuxError> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            error!("Mux rejected credentials with status {}", status);
            return Err(MuxError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Mux API error: {} - {}", status, body);
            return Err(MuxError::Api { status: status.as_u16(), body });
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| MuxError::InvalidResponse(e.to_string()))?;

        Ok(envelope.data)
    }
}
