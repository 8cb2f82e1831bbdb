pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod mux;
pub mod routes;
pub mod webhook;

use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, HttpResponse};
use tracing::info;

pub use config::Settings;
pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;

pub use auth::AuthService;
pub use db::{CourseRepository, DbOperations};
pub use mux::VideoService;

/// Health check endpoint handler
/// Returns server status, the time and which backing services are usable
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let mux_configured = state.video.is_configured();
    let message = if mux_configured {
        "Kohza server is running"
    } else {
        "Kohza server is running (Mux uploads simulated)"
    };

    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "message": message,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "services": {
            "mux": mux_configured,
            "database": true,
        }
    }))
}

/// Application state shared across all workers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub repo: Arc<dyn CourseRepository>,
    pub video: Arc<VideoService>,
    pub auth: Arc<AuthService>,
}

impl AppState {
    /// Connects to Postgres and, when configured, applies pending migrations.
    pub async fn new(config: Settings) -> Result<Self> {
        let db = DbOperations::new_with_options(
            &config.database.url,
            config.database.max_connections,
            Duration::from_secs(config.database.acquire_timeout_secs),
        )
        .await?;

        if config.database.run_migrations {
            db.run_migrations().await?;
            info!("Database migrations applied");
        }

        Self::with_repository(config, Arc::new(db))
    }

    /// Same as [`AppState::new`] but the pool connects on first use.
    pub fn lazy(config: Settings) -> Result<Self> {
        let db = DbOperations::new_lazy(
            &config.database.url,
            config.database.max_connections,
            Duration::from_secs(config.database.acquire_timeout_secs),
        )?;
        Self::with_repository(config, Arc::new(db))
    }

    pub fn with_repository(config: Settings, repo: Arc<dyn CourseRepository>) -> Result<Self> {
        let video = VideoService::from_config(&config.mux)?;
        let auth = AuthService::new(&config.supabase)?;

        Ok(Self {
            config: Arc::new(config),
            repo,
            video: Arc::new(video),
            auth: Arc::new(auth),
        })
    }
}
