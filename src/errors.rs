use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::services::reconciler::GridError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl AppError {
    /// Lets the client pick how to surface the error: inline for
    /// validation, a warning toast, or a blocking conflict toast.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::NotFound(_) => "not_found",
            AppError::Backend(_) => "backend",
            AppError::Grid(err) => match err {
                GridError::SlotOccupied { .. }
                | GridError::NoSelectableSlots { .. }
                | GridError::NoSelectableTime { .. } => "warning",
                GridError::PendingConflict { .. } => "conflict",
                GridError::SlotClosed { .. }
                | GridError::SlotBlocked { .. }
                | GridError::OutsideWindow { .. }
                | GridError::EmptySelection
                | GridError::NonexistentLocalTime { .. } => "validation",
            },
        }
    }

    pub fn backend(err: anyhow::Error) -> Self {
        AppError::Backend(format!("{err:#}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Backend(_) => StatusCode::BAD_GATEWAY,
            AppError::Grid(GridError::SlotOccupied { .. } | GridError::PendingConflict { .. }) => {
                StatusCode::CONFLICT
            }
            AppError::Grid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };

        let body = serde_json::json!({ "error": self.to_string(), "kind": self.kind() });
        (status, axum::Json(body)).into_response()
    }
}
