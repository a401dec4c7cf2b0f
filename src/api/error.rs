use crate::analysis::AnalysisError;
use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_)
            | ApiError::Analysis(AnalysisError::HorizonOutOfRange { .. }) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Analysis(AnalysisError::InsufficientData { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Internal(e) => {
                tracing::error!(error = %format!("{:#}", e), "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(json!({
            "data": null,
            "meta": { "error": self.to_string() }
        }));
        (status, body).into_response()
    }
}
