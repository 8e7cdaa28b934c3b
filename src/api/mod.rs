//! HTTP transport
//!
//! Exposes the evaluation service as `POST /v1` and maps evaluation
//! errors to status codes.

pub mod routes;

pub use routes::configure;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};

use crate::detection::EvaluationError;

/// Body of every error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub status: u16,
    pub retryable: bool,
}

impl ResponseError for EvaluationError {
    fn status_code(&self) -> StatusCode {
        match self {
            EvaluationError::Validation(_) => StatusCode::BAD_REQUEST,
            EvaluationError::Resolver(_) => StatusCode::BAD_GATEWAY,
            EvaluationError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            EvaluationError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            EvaluationError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        HttpResponse::build(status).json(ErrorBody {
            error: self.public_message(),
            status: status.as_u16(),
            retryable: self.is_retryable(),
        })
    }
}
