use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::core::{Page, Predicate, SortOrder};
use crate::models::{
    AgentProfile, NewProperty, NewRating, Property, PropertyDetails, PropertyImages, PropertyView,
    ViewOutcome,
};

/// Errors that can occur when reading or writing listings
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A unique constraint rejected the write
    #[error("Duplicate: {0}")]
    Duplicate(String),
}

/// Persistence boundary for listings, views and agent ratings.
///
/// Implementations must make `record_view` and `insert_rating` atomic with
/// respect to their uniqueness keys.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Matching properties in `order`, restricted to `page`, plus the total match count
    async fn list_properties(
        &self,
        predicate: &Predicate,
        order: SortOrder,
        page: Page,
    ) -> Result<(Vec<Property>, i64), StoreError>;

    /// Every matching property in creation order
    async fn search_properties(&self, predicate: &Predicate) -> Result<Vec<Property>, StoreError>;

    async fn find_property(&self, id: Uuid) -> Result<Property, StoreError>;

    async fn find_property_by_slug(&self, slug: &str) -> Result<Property, StoreError>;

    async fn create_property(&self, new: NewProperty) -> Result<Property, StoreError>;

    async fn update_property(&self, id: Uuid, details: PropertyDetails) -> Result<Property, StoreError>;

    async fn update_images(&self, id: Uuid, images: PropertyImages) -> Result<Property, StoreError>;

    /// Returns false when nothing was deleted
    async fn delete_property(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Record a view from `ip` once, incrementing the view counter only for the first one
    async fn record_view(&self, property_id: Uuid, ip: &str) -> Result<ViewOutcome, StoreError>;

    async fn list_views(&self) -> Result<Vec<PropertyView>, StoreError>;

    /// Profile flagged as an agent; `NotFound` otherwise
    async fn find_agent_profile(&self, id: Uuid) -> Result<AgentProfile, StoreError>;

    async fn rating_exists(&self, rater_id: Uuid, agent_id: Uuid) -> Result<bool, StoreError>;

    /// Insert the rating and recompute the agent's aggregates from all ratings.
    ///
    /// Fails with `Duplicate` when the rater already rated this agent.
    async fn insert_rating(&self, rating: NewRating) -> Result<AgentProfile, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError>;
}
