// Route exports
pub mod health;
pub mod properties;
pub mod ratings;

use actix_web::web;
use std::sync::Arc;

use crate::config::PaginationSettings;
use crate::services::ListingService;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub listings: Arc<ListingService>,
    pub pagination: PaginationSettings,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(health::configure)
            .configure(properties::configure)
            .configure(ratings::configure),
    );
}
