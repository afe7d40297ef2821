//! HTTP surface.
//!
//! | Route | Response |
//! |-------|----------|
//! | `GET /` | service descriptor |
//! | `GET /health` | `{status: "healthy", timestamp}` |
//! | `POST /rerank` | `{items, method, cached}`, 400 on invalid input |
//! | anything else | 404 |
//!
//! Unhandled failures return 500 with a fixed body; details only go to the log.

use actix_cors::Cors;
use actix_web::http::StatusCode;
use actix_web::middleware::{Condition, Logger};
use actix_web::{web, App, HttpResponse, HttpServer, ResponseError};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::ServiceConfig;
use crate::error::RerankError;
use crate::service::{RerankRequest, RerankService};

/// Request bodies above this size are rejected.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

const ENDPOINTS: [&str; 3] = ["GET /", "GET /health", "POST /rerank"];

impl ResponseError for RerankError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(RerankError::status_code(self))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        if !self.is_user_error() {
            error!(error = %self, "request failed");
        }
        HttpResponse::build(ResponseError::status_code(self))
            .json(json!({ "error": self.public_message() }))
    }
}

async fn descriptor() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ENDPOINTS,
    }))
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn rerank(
    service: web::Data<RerankService>,
    body: web::Bytes,
) -> Result<HttpResponse, RerankError> {
    let request: RerankRequest = serde_json::from_slice(&body)
        .map_err(|e| RerankError::validation(format!("invalid request body: {e}")))?;
    let response = service.rerank(&request).await?;
    Ok(HttpResponse::Ok().json(response))
}

async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({ "error": "Not found" }))
}

/// Register all routes. The service must be provided as `web::Data<RerankService>`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
        .route("/", web::get().to(descriptor))
        .route("/health", web::get().to(health))
        .route("/rerank", web::post().to(rerank))
        .default_service(web::to(not_found));
}

/// Serve until shutdown.
pub async fn run(config: &ServiceConfig, service: Arc<RerankService>) -> std::io::Result<()> {
    let data = web::Data::from(service);
    let cors_enabled = config.server.cors_enabled;
    let address = config.bind_address();

    info!(address = %address, cors = cors_enabled, "starting rerank server");

    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(Condition::new(cors_enabled, Cors::permissive()))
            .wrap(Logger::default())
            .configure(configure)
    })
    .bind(address)?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn test_validation_error_response() {
        let err = RerankError::validation("items must not be empty");
        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "items must not be empty");
    }

    #[actix_web::test]
    async fn test_internal_error_response_is_generic() {
        let err = RerankError::Internal("secret detail".to_string());
        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, json!({ "error": "Internal server error" }));
    }
}
