use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use stayline_booking::ReconcileError;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    PaymentRequired(String),
    UpstreamError(String),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::PaymentRequired(msg) => (StatusCode::PAYMENT_REQUIRED, msg),
            AppError::UpstreamError(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Anyhow(err.into())
    }
}

/// Map pipeline failures onto HTTP semantics. Not a From impl: the blanket
/// anyhow conversion above would conflict with one.
pub fn reconcile_error(err: ReconcileError) -> AppError {
    match err {
        ReconcileError::MissingGuestDetails
        | ReconcileError::MissingBookingCode
        | ReconcileError::InvalidFare
        | ReconcileError::StaleSnapshot => AppError::ConflictError(err.to_string()),
        ReconcileError::Validation(inner) => AppError::ValidationError(inner.to_string()),
        ReconcileError::Assemble(inner) => AppError::ValidationError(inner.to_string()),
        ReconcileError::NotAuthorised { .. } => AppError::PaymentRequired(err.to_string()),
        ReconcileError::UnknownOrderRef => AppError::NotFoundError(err.to_string()),
        ReconcileError::ConfirmationInProgress => AppError::ConflictError(err.to_string()),
        ReconcileError::InvalidTransition(inner) => AppError::ConflictError(inner.to_string()),
        ReconcileError::VendorRejected(msg) => AppError::UpstreamError(msg),
        ReconcileError::Gateway(msg) => AppError::UpstreamError(msg),
        ReconcileError::Storage(msg) => AppError::InternalServerError(msg),
    }
}
