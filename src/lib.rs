//! Realty Listings - property listing backend
//!
//! Property CRUD, filtered and structured search, per-address view counting
//! and agent ratings over a pluggable `ListingStore`.

pub mod auth;
pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use auth::{AuthUser, JwtVerifier};
pub use error::ApiError;
pub use models::{AgentProfile, Property, PropertyDetails, SearchRequest};
pub use services::{ListingService, ListingStore, MemoryStore, PostgresClient};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let filter = core::PropertyFilter::default();
        assert_eq!(filter.to_predicate(), core::Predicate::always());
    }
}
