//! HTTP response DTOs and error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::application::ports::StoreError;
use crate::application::services::IntakeError;
use crate::application::use_cases::PortfolioError;
use crate::domain::shared::{Timestamp, UserId};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// Acknowledgement of a queued rebalance request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalanceAcceptedResponse {
    /// Human-readable status.
    pub message: String,
    /// User the request targets.
    pub user_id: UserId,
    /// Timestamp stamped at intake.
    pub created_at: Timestamp,
}

/// Error body returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
}

/// An error ready to be rendered as an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// 400 with `message`.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<PortfolioError> for ApiError {
    fn from(err: PortfolioError) -> Self {
        let status = match &err {
            PortfolioError::AlreadyRegistered { .. } => StatusCode::CONFLICT,
            PortfolioError::NotFound { .. } => StatusCode::NOT_FOUND,
            PortfolioError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            PortfolioError::Store(e) => {
                tracing::error!(error = %e, "Allocation store failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "Store failure");
        Self::internal(err.to_string())
    }
}

impl From<IntakeError> for ApiError {
    fn from(err: IntakeError) -> Self {
        Self::internal(err.to_string())
    }
}
