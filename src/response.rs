use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct ApiErrorResponse {
    error: String,
}

impl ApiErrorResponse {
    pub fn send(code: u16, message: Option<String>) -> Response {
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let error = message.unwrap_or_else(|| status.to_string());

        (status, Json(ApiErrorResponse { error })).into_response()
    }
}
