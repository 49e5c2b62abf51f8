use crate::config::ConfigError;
use crate::responses::NormalizeError;
use crate::rubric::{RubricImportError, StoreError};
use crate::service::QualificationError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Store(StoreError),
    Import(RubricImportError),
    Normalize(NormalizeError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Store(err) => write!(f, "rubric store error: {}", err),
            AppError::Import(err) => write!(f, "rubric import error: {}", err),
            AppError::Normalize(err) => write!(f, "response format error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Import(err) => Some(err),
            AppError::Normalize(err) => Some(err),
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Import(_) => StatusCode::BAD_REQUEST,
            AppError::Normalize(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Store(err) => match err {
                StoreError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                StoreError::Conflict(_) | StoreError::SupersededVersion { .. } => {
                    StatusCode::CONFLICT
                }
                StoreError::NoActiveConfiguration { .. } | StoreError::VersionNotFound { .. } => {
                    StatusCode::NOT_FOUND
                }
                StoreError::Infrastructure(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut body = json!({ "error": self.to_string() });
        if let AppError::Store(err) = &self {
            if let StoreError::Validation(validation) = err {
                body["issues"] = json!(validation.issues);
            }
            if err.is_retryable() {
                body["retryable"] = json!(true);
            }
        }

        (self.status_code(), Json(body)).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<RubricImportError> for AppError {
    fn from(value: RubricImportError) -> Self {
        Self::Import(value)
    }
}

impl From<QualificationError> for AppError {
    fn from(value: QualificationError) -> Self {
        match value {
            QualificationError::Store(err) => Self::Store(err),
            QualificationError::Normalize(err) => Self::Normalize(err),
        }
    }
}
