use axum::{
    Json,
    extract::rejection::{PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use config::ConfigError;
use db::{DbErr, HierarchyError};
use deployment::DeploymentError;
use thiserror::Error;
use utils_core::response::ApiResponse;

#[derive(Debug, Error, ts_rs::TS)]
#[ts(type = "string")]
pub enum ApiError {
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = match &self {
            ApiError::Hierarchy(err) => match err {
                HierarchyError::NotFound { .. } => (StatusCode::NOT_FOUND, "NotFound"),
                HierarchyError::Validation { .. } => (StatusCode::BAD_REQUEST, "ValidationError"),
                HierarchyError::ConstraintViolation(_) => {
                    (StatusCode::BAD_REQUEST, "ConstraintViolation")
                }
                HierarchyError::Database(DbErr::RecordNotFound(_)) => {
                    (StatusCode::NOT_FOUND, "DatabaseError")
                }
                HierarchyError::Database(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError")
                }
            },
            ApiError::Deployment(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DeploymentError"),
            ApiError::Database(db_err) => match db_err {
                DbErr::RecordNotFound(_) => (StatusCode::NOT_FOUND, "DatabaseError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
            },
            ApiError::Config(err) => match err {
                ConfigError::Validation(_) => (StatusCode::BAD_REQUEST, "ConfigError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "ConfigError"),
            },
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
        };

        let error_message = match &self {
            ApiError::Hierarchy(err) => match err {
                HierarchyError::NotFound { kind, .. } => format!("{kind} not found"),
                HierarchyError::Validation { .. } | HierarchyError::ConstraintViolation(_) => {
                    err.to_string()
                }
                HierarchyError::Database(DbErr::RecordNotFound(msg)) => msg.clone(),
                HierarchyError::Database(_) => format!("{}: {}", error_type, self),
            },
            ApiError::Database(DbErr::RecordNotFound(msg)) => msg.clone(),
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::Internal(msg) => msg.clone(),
            ApiError::BadRequest(msg) => msg.clone(),
            _ => format!("{}: {}", error_type, self),
        };

        if status_code.is_server_error() {
            tracing::error!(
                status = %status_code,
                error_type,
                error = %self,
                "API request failed"
            );
        }
        let response = ApiResponse::<()>::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}
