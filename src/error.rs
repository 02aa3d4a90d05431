//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Misconfiguration of a service, filter or entity. Raised before storage is touched.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("the list model is not defined in {0}; set the collection to query before running it")]
    ListModelNotDefined(String),
    #[error("the action model is not defined in {0}; set the collection to act on before processing actions")]
    ActionModelNotDefined(String),
    #[error("the filter name is not defined or empty in custom filter {0}; every custom filter must return a non-empty name")]
    CustomFilterNameNotDefined(String),
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("invalid primary key: entity {entity} column {column}")]
    InvalidPrimaryKey { entity: String, column: String },
    #[error("duplicate name: {0}")]
    DuplicateName(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("This action requires an authenticated user.")]
    Unauthenticated,
    #[error("unknown action type: {0}")]
    UnknownActionType(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("bad request: {0}")]
    BadRequest(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            AppError::UnknownActionType(_) => (StatusCode::UNPROCESSABLE_ENTITY, "unknown_action_type"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::Db(e) => {
                if let sqlx::Error::RowNotFound = e {
                    (StatusCode::NOT_FOUND, "not_found")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            }
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        let status = |e: AppError| e.into_response().status();
        assert_eq!(status(AppError::Unauthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(status(AppError::UnknownActionType("archive".into())), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status(AppError::Validation("bad".into())), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status(AppError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(AppError::Db(sqlx::Error::RowNotFound)), StatusCode::NOT_FOUND);
        assert_eq!(
            status(ConfigError::ListModelNotDefined("ListService".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn config_messages_name_the_service() {
        let msg = ConfigError::ActionModelNotDefined("ActionService".into()).to_string();
        assert!(msg.contains("ActionService"));
    }
}
