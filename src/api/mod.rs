pub mod handlers;
pub mod routes;
pub mod state;
pub mod types;

pub use routes::create_router;
pub use state::AppState;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::BourseError;
use types::ErrorResponse;

impl IntoResponse for BourseError {
    fn into_response(self) -> Response {
        let status = match &self {
            BourseError::NotFound { .. } => StatusCode::NOT_FOUND,
            BourseError::Forbidden { .. } => StatusCode::FORBIDDEN,
            BourseError::DuplicateSymbol(_) | BourseError::StockInUse(_) => StatusCode::CONFLICT,
            BourseError::InvalidQuantity(_)
            | BourseError::InvalidAmount(_)
            | BourseError::InsufficientFunds { .. }
            | BourseError::InsufficientVolume { .. }
            | BourseError::InsufficientShares { .. }
            | BourseError::OrderNotPending(_)
            | BourseError::NoPaymentMethod
            | BourseError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Infrastructure details stay in the logs, not the response body.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Request failed");
            "internal error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
