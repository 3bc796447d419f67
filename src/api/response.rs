//! `{ success, data, message }` envelope shared by every endpoint.

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
}

pub fn success<T: Serialize>(data: T, message: impl Into<String>) -> Json<ApiResponse<T>> {
    Json(ApiResponse { success: true, data: Some(data), message: message.into() })
}

pub fn success_message(message: impl Into<String>) -> Json<ApiResponse<()>> {
    Json(ApiResponse { success: true, data: None, message: message.into() })
}

pub fn failure(message: impl Into<String>) -> Json<ApiResponse<()>> {
    Json(ApiResponse { success: false, data: None, message: message.into() })
}
