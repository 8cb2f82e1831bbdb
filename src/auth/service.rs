use std::time::Duration;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::config::SupabaseConfig;
use crate::error::{AppError, AuthError};
use crate::Result;

/// Claims carried by Supabase access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl Claims {
    pub fn user_id(&self) -> std::result::Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::InvalidToken)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
    pub user: AuthUser,
}

/// GoTrue answers sign-up with a session when e-mail confirmation is off,
/// and with the bare user when it is on.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(Session),
    User(AuthUser),
}

#[derive(Debug, Clone, Serialize)]
pub struct SignUpOutcome {
    pub user: AuthUser,
    pub session: Option<Session>,
    pub confirmation_required: bool,
}

pub struct AuthService {
    http: reqwest::Client,
    supabase_url: String,
    anon_key: String,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthService {
    pub fn new(config: &SupabaseConfig) -> Result<Self> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[config.jwt_audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build auth HTTP client: {}", e)))?;

        Ok(Self {
            http,
            supabase_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        })
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.supabase_url, path)
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<SignUpOutcome> {
        let response = self
            .http
            .post(self.endpoint("signup"))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "data": metadata,
            }))
            .send()
            .await
            .map_err(|e| AuthError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Sign-up rejected for {}: {} - {}", email, status, body);
            return Err(if status.is_client_error() {
                AppError::ValidationError(error_message(&body))
            } else {
                AuthError::Upstream(format!("{} - {}", status, body)).into()
            });
        }

        let parsed: SignUpResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Upstream(format!("Unexpected sign-up response: {}", e)))?;

        info!("Sign-up accepted for {}", email);
        Ok(match parsed {
            SignUpResponse::Session(session) => SignUpOutcome {
                user: session.user.clone(),
                session: Some(session),
                confirmation_required: false,
            },
            SignUpResponse::User(user) => SignUpOutcome {
                user,
                session: None,
                confirmation_required: true,
            },
        })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .http
            .post(self.endpoint("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AuthError::Upstream(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::InvalidCredentials(error_message(&body)).into());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Upstream(format!("{} - {}", status, body)).into());
        }

        let session = response
            .json::<Session>()
            .await
            .map_err(|e| AuthError::Upstream(format!("Unexpected sign-in response: {}", e)))?;
        Ok(session)
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<()> {
        let response = self
            .http
            .post(self.endpoint("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::Upstream(e.to_string()))?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AuthError::InvalidToken.into()),
            s => Err(AuthError::Upstream(format!("Sign-out failed with {}", s)).into()),
        }
    }
}

/// Pulls the human readable message out of a GoTrue error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string())
}
