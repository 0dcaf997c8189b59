use axum::{http::StatusCode, Json};
use serde::Serialize;

use crate::error::AppError;

/// Uniform envelope for every response body, success or failure.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), AppError>;

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> (StatusCode, Json<Self>) {
        Self::with_status(StatusCode::OK, message, Some(data))
    }

    pub fn created(message: impl Into<String>, data: T) -> (StatusCode, Json<Self>) {
        Self::with_status(StatusCode::CREATED, message, Some(data))
    }

    fn with_status(
        status: StatusCode,
        message: impl Into<String>,
        data: Option<T>,
    ) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                success: true,
                message: message.into(),
                data,
            }),
        )
    }
}

impl ApiResponse<()> {
    /// Success without a payload.
    pub fn message(message: impl Into<String>) -> (StatusCode, Json<Self>) {
        Self::with_status(StatusCode::OK, message, None)
    }
}

impl ApiResponse<serde_json::Value> {
    pub fn failure(message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data,
        }
    }
}
