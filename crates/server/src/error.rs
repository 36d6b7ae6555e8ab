use axum::{
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson, Response},
};
use db::ordering::OrderingError;
use services::services::plan_editor::PlanEditorError;
use thiserror::Error;
use tracing::error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    PlanEditor(#[from] PlanEditorError),
    #[error("missing or invalid caller identity: {0}")]
    Unauthorized(String),
}

fn ordering_status(err: &OrderingError) -> StatusCode {
    match err {
        OrderingError::NotFound(_) => StatusCode::NOT_FOUND,
        OrderingError::LockedByCompletion => StatusCode::LOCKED,
        OrderingError::ConcurrencyConflict => StatusCode::CONFLICT,
        OrderingError::Validation(_) => StatusCode::BAD_REQUEST,
        OrderingError::InvariantViolated(_) | OrderingError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::PlanEditor(PlanEditorError::Ordering(err)) => ordering_status(err),
            ApiError::PlanEditor(PlanEditorError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::PlanEditor(PlanEditorError::Forbidden) => StatusCode::FORBIDDEN,
            ApiError::PlanEditor(PlanEditorError::Database(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "Request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, ResponseJson(ApiResponse::<()>::error(message))).into_response()
    }
}
