use axum::extract::rejection::JsonRejection;
use axum::{Json, http::StatusCode, response::{IntoResponse, Redirect, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

pub const LOGIN_PATH: &str = "/login";

/// Any failure reported by the hosted service (query, auth or storage) or by
/// the embedded development backend.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct BackendError {
    pub status: Option<u16>,
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status, Some(401) | Some(403))
    }
}

impl From<sqlx::Error> for BackendError {
    fn from(err: sqlx::Error) -> Self {
        BackendError::new(format!("database error: {}", err))
    }
}

impl From<sqlx::migrate::MigrateError> for BackendError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        BackendError::new(format!("migration error: {}", err))
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => BackendError::with_status(status.as_u16(), err.to_string()),
            None => BackendError::new(format!("request failed: {}", err)),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Backend(#[from] BackendError),

    #[error("Failed to upload image: {0}")]
    Upload(#[source] BackendError),

    #[error("Spreadsheet error: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),

    #[error("Not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Internal server error")]
    InternalServerError,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Backend(_) | AppError::Upload(_) => StatusCode::BAD_GATEWAY,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::SEE_OTHER,
            AppError::Export(_) | AppError::InternalServerError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text shown to the user in the transient notice.
    pub fn notice(&self) -> String {
        match self {
            AppError::Validation(msg) | AppError::BadRequest(msg) | AppError::Conflict(msg) => {
                msg.clone()
            }
            other => other.to_string(),
        }
    }

    /// Logs backend-side failures once, at the handler boundary.
    pub fn log(&self) {
        match self {
            AppError::Backend(e) => error!("backend error: {}", e),
            AppError::Upload(e) => error!("upload error: {}", e),
            AppError::Export(e) => error!("export error: {}", e),
            AppError::InternalServerError => error!("internal server error"),
            _ => {}
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Unauthorized = self {
            return Redirect::to(LOGIN_PATH).into_response();
        }
        self.log();

        let status = self.status_code();
        let body = Json(ErrorResponse {
            error: status.to_string(),
            message: self.notice(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_error_prefixes_backend_message() {
        let err = AppError::Upload(BackendError::new("The resource already exists"));
        assert_eq!(err.notice(), "Failed to upload image: The resource already exists");
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn unauthorized_redirects_to_login() {
        let response = AppError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(axum::http::header::LOCATION).unwrap(),
            LOGIN_PATH
        );
    }

    #[test]
    fn validation_notice_is_the_bare_message() {
        let err = AppError::Validation("Image is required".to_string());
        assert_eq!(err.notice(), "Image is required");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
