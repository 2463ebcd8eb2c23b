use actix_web::{web, HttpResponse, Responder};

use crate::models::HealthResponse;
use crate::routes::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let status = if state.listings.health().await { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}
