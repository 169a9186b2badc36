use crate::db::CacheError;
use crate::engine::SimulationError;
use crate::orchestration::{LoadError, OrchestrationError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    #[error("Upstream data error: {0}")]
    Upstream(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<OrchestrationError> for AppError {
    fn from(err: OrchestrationError) -> Self {
        match err {
            OrchestrationError::Simulation(e) => AppError::Simulation(e),
            OrchestrationError::Load(e @ LoadError::InvalidRange { .. }) => {
                AppError::BadRequest(e.to_string())
            }
            OrchestrationError::Load(e) => AppError::Upstream(e.to_string()),
        }
    }
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Simulation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> String {
        match self {
            AppError::BadRequest(msg) | AppError::Upstream(msg) | AppError::Internal(msg) => {
                msg.clone()
            }
            AppError::Simulation(e) => e.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let headline = match self {
            AppError::Internal(_) => "Internal server error",
            _ => "Failed to simulate strategy",
        };
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": headline,
            "details": self.details(),
            "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }));

        (status, body).into_response()
    }
}
