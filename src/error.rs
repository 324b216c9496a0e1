use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::response::ApiErrorResponse;

/// Boundary errors sent to HTTP callers. Upstream detail is logged at the
/// handler and never leaks past this point; callers only ever see the fixed
/// per-endpoint message.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Error fetching total supply")]
    TotalSupply,
    #[error("Error fetching circulating supply")]
    CirculatingSupply,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code: StatusCode = match self {
            ApiError::TotalSupply | ApiError::CirculatingSupply => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        ApiErrorResponse::send(status_code.as_u16(), Some(self.to_string()))
    }
}
