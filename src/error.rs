// src/error.rs

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use serde_json::json;

/// Error type shared by every handler. Maps one-to-one onto the HTTP
/// statuses the API exposes, so handlers can just use `?`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    /// Webhook signature missing or failed verification. The event body must
    /// not be trusted in any way past this point.
    #[error("webhook rejected: {0}")]
    UnauthenticatedEvent(String),

    /// Webhook passed verification but the payload is missing required fields.
    #[error("malformed webhook event: {0}")]
    MalformedEvent(String),

    #[error("Payment required to download this resource.")]
    PaymentRequired,

    #[error("{0}")]
    NotFound(String),

    #[error("Purchase ID {0} is already marked as paid.")]
    AlreadyPaid(i32),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Admin role required.")]
    Forbidden,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("payment gateway error: {0}")]
    Gateway(String),

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
}

impl actix_web::ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::UnauthenticatedEvent(_)
            | ApiError::MalformedEvent(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::AlreadyPaid(_) => StatusCode::CONFLICT,
            ApiError::Database(_) | ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Gateway(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            log::error!("{self}");
        }
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
