//! Request-path error taxonomy and its HTTP shape.
//!
//! Every failure reaches the client as `{ "success": false, "message": ... }`; validation
//! failures additionally carry the per-field `errors` map. Storage errors are logged here
//! and never echoed back.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::error;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// First violation per field, keyed by the request's field name.
pub type FieldErrors = BTreeMap<&'static str, String>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("invalid input: {0:?}")]
    Validation(FieldErrors),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Persistence(#[from] sqlx::Error),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<FieldErrors>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Unique-constraint violations surface as conflicts, anything else stays a storage error.
    pub fn from_write(err: sqlx::Error, conflict: &str) -> AppError {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(conflict.to_owned())
            }
            _ => AppError::Persistence(err),
        }
    }

    fn user_message(&self) -> String {
        match self {
            AppError::Validation(_) => "입력 데이터가 유효하지 않습니다".to_owned(),
            AppError::BadRequest(message) | AppError::Conflict(message) => message.clone(),
            AppError::Unauthorized => "로그인이 필요합니다".to_owned(),
            AppError::Forbidden(message) => (*message).to_owned(),
            AppError::NotFound(what) => format!("{what}을(를) 찾을 수 없습니다"),
            AppError::Persistence(_) => {
                "서버 오류가 발생했습니다. 잠시 후 다시 시도해주세요.".to_owned()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!("{self}");
        }

        let body = ErrorBody {
            success: false,
            message: self.user_message(),
            errors: match self {
                AppError::Validation(errors) => Some(errors),
                _ => None,
            },
        };

        (status, Json(body)).into_response()
    }
}
