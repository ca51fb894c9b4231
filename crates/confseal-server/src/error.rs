//! Mapping of core errors onto HTTP responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use confseal_core::{CipherError, Error, ExportError, RegistryError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Core(#[from] Error),
}

impl From<ExportError> for ApiError {
    fn from(e: ExportError) -> Self {
        ApiError::Core(e.into())
    }
}

impl From<CipherError> for ApiError {
    fn from(e: CipherError) -> Self {
        ApiError::Core(e.into())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Core(e) => match e {
                Error::Export(ExportError::UnsupportedFormat(_)) => StatusCode::BAD_REQUEST,
                Error::Registry(RegistryError::DuplicateSourceName(_)) => StatusCode::CONFLICT,
                Error::Registry(RegistryError::NotFound(_)) => StatusCode::NOT_FOUND,
                Error::Cipher(CipherError::NoKey) => StatusCode::SERVICE_UNAVAILABLE,
                Error::Cipher(CipherError::Decrypt(_) | CipherError::Encoding(_)) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
