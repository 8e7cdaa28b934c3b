use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;

use super::ErrorBody;
use crate::detection::{EvaluationError, TravelAnomalyService};
use crate::models::{AnomalyResponse, LoginRequest};

/// Register the service routes
///
/// The application must provide a `web::Data<TravelAnomalyService>`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .route("/v1", web::post().to(post_event))
        .route("/health", web::get().to(health));
}

/// Evaluate one login event
async fn post_event(
    service: web::Data<TravelAnomalyService>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, EvaluationError> {
    let result = service.evaluate_request(&body).await?;
    Ok(HttpResponse::Ok().json(AnomalyResponse::from(&result)))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Undecodable bodies are client errors, reported like validation failures
fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let body = ErrorBody {
        error: format!("invalid request body: {}", err),
        status: 400,
        retryable: false,
    };
    InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
}
