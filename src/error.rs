use thiserror::Error;
use actix_web::{ResponseError, HttpResponse, http::StatusCode};
use serde_json::json;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    AuthError(#[from] AuthError),

    #[error("Video provider error: {0}")]
    MuxError(#[from] MuxError),

    #[error("Webhook error: {0}")]
    WebhookError(#[from] WebhookError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::DatabaseError(DatabaseError::NotFound(what.into()))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.into())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::MuxError(MuxError::Request(err.to_string()))
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::AuthError(err.into())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::DatabaseError(DatabaseError::MigrationError(err.to_string()))
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = self.to_string();
        let response = json!({
            "error": {
                "status": status.as_u16(),
                "message": message
            }
        });
        HttpResponse::build(status).json(response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::AuthError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
                AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
                AuthError::InvalidCredentials(_) => StatusCode::UNAUTHORIZED,
                AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
                AuthError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::WebhookError(e) => match e {
                WebhookError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
                WebhookError::MissingSignature
                | WebhookError::InvalidSignature
                | WebhookError::StaleSignature => StatusCode::UNAUTHORIZED,
            },
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::DatabaseError(DatabaseError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::DatabaseError(DatabaseError::Duplicate(_)) => StatusCode::CONFLICT,
            AppError::DatabaseError(DatabaseError::InvalidReference(_)) => StatusCode::BAD_REQUEST,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::MuxError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Auth service error: {0}")]
    Upstream(String),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        }
    }
}

#[derive(Error, Debug)]
pub enum MuxError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Mux rejected the API credentials")]
    Unauthorized,

    #[error("Mux API error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Missing Mux-Signature header")]
    MissingSignature,

    #[error("Signature mismatch")]
    InvalidSignature,

    #[error("Signature timestamp outside tolerance")]
    StaleSignature,
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Referenced record does not exist: {0}")]
    InvalidReference(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Record".to_string()),
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                DatabaseError::Duplicate(db_err.message().to_string())
            }
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                DatabaseError::InvalidReference(db_err.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
                DatabaseError::ConnectionError(err.to_string())
            }
            _ => DatabaseError::QueryError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::InternalError(_)));

        let config_err = config::ConfigError::NotFound(String::from("key not found"));
        let app_err: AppError = config_err.into();
        assert!(matches!(app_err, AppError::ConfigError(_)));

        let db_err = sqlx::Error::RowNotFound;
        let app_err: AppError = db_err.into();
        assert!(matches!(app_err, AppError::DatabaseError(DatabaseError::NotFound(_))));

        let db_err = sqlx::Error::PoolTimedOut;
        let app_err: AppError = db_err.into();
        assert!(matches!(app_err, AppError::DatabaseError(DatabaseError::ConnectionError(_))));
    }

    #[test]
    fn test_jwt_error_conversion() {
        let expired = jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::ExpiredSignature);
        assert!(matches!(AuthError::from(expired), AuthError::TokenExpired));

        let bad = jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::InvalidSignature);
        assert!(matches!(AuthError::from(bad), AuthError::InvalidToken));
    }

    #[test]
    fn test_error_status_codes() {
        let err = AppError::AuthError(AuthError::MissingToken);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let err = AppError::AuthError(AuthError::Forbidden("coach only".into()));
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let err = AppError::ValidationError("invalid input".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = AppError::not_found("Lesson");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = AppError::DatabaseError(DatabaseError::Duplicate("enrollment".into()));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let err = AppError::MuxError(MuxError::Api { status: 422, body: "bad".into() });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = AppError::WebhookError(WebhookError::InvalidPayload("no type".into()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = AppError::WebhookError(WebhookError::InvalidSignature);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_error_display() {
        let err = AppError::ValidationError("test error".to_string());
        assert_eq!(err.to_string(), "Validation error: test error");

        let err = AppError::not_found("Lesson");
        assert_eq!(err.to_string(), "Database error: Lesson not found");

        let err = AppError::MuxError(MuxError::Api { status: 400, body: "nope".into() });
        assert_eq!(err.to_string(), "Video provider error: Mux API error: 400 - nope");
    }

    #[actix_web::test]
    async fn test_error_response_body() {
        let err = AppError::not_found("Course");
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["status"], 404);
        assert_eq!(json["error"]["message"], "Database error: Course not found");
    }
}
