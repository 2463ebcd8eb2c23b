use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::core::{
    ensure_not_self, slug, validate_rating_value, LabelPolicy, Page, PropertyFilter, SearchCriteria,
    SortOrder,
};
use crate::error::ApiError;
use crate::models::{
    AgentProfile, ImageUploadRequest, NewProperty, NewRating, Property, PropertyDetails,
    PropertyView, RatingRequest, SearchRequest,
};
use crate::services::store::{ListingStore, StoreError};

/// Listing operations on top of a `ListingStore`.
///
/// The caller's identity is always an explicit argument; nothing here reads
/// request state.
#[derive(Clone)]
pub struct ListingService {
    store: Arc<dyn ListingStore>,
    label_policy: LabelPolicy,
}

impl ListingService {
    pub fn new(store: Arc<dyn ListingStore>, label_policy: LabelPolicy) -> Self {
        Self { store, label_policy }
    }

    pub async fn health(&self) -> bool {
        match self.store.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                tracing::warn!("Storage health check failed: {}", e);
                false
            }
        }
    }

    pub async fn list_properties(
        &self,
        filter: &PropertyFilter,
        order: SortOrder,
        page: Page,
    ) -> Result<(Vec<Property>, i64), ApiError> {
        let predicate = filter.to_predicate();
        let (properties, total) = self.store.list_properties(&predicate, order, page).await?;

        tracing::debug!(
            "Listed {} of {} properties (page {}, size {})",
            properties.len(),
            total,
            page.number,
            page.size
        );
        Ok((properties, total))
    }

    pub async fn list_views(&self) -> Result<Vec<PropertyView>, ApiError> {
        Ok(self.store.list_views().await?)
    }

    /// Fetch a property by slug, counting the view from `origin` once
    pub async fn view_property(&self, slug: &str, origin: &str) -> Result<Property, ApiError> {
        let property = self.store.find_property_by_slug(slug).await?;
        self.record_view(property.id, origin).await
    }

    pub async fn record_view(&self, property_id: Uuid, origin: &str) -> Result<Property, ApiError> {
        let outcome = self.store.record_view(property_id, origin).await?;
        if outcome.recorded {
            tracing::debug!("New view of {} from {}", property_id, origin);
        }
        Ok(outcome.property)
    }

    pub async fn create_property(
        &self,
        caller: AuthUser,
        details: PropertyDetails,
    ) -> Result<Property, ApiError> {
        details.validate()?;

        let new = NewProperty {
            user_id: caller.id,
            slug: slug::unique_slug(&details.title),
            ref_code: slug::ref_code(),
            details: details.normalized(),
        };
        let property = self.store.create_property(new).await?;

        tracing::info!("User {} created property {}", caller.id, property.slug);
        Ok(property)
    }

    pub async fn update_property(
        &self,
        caller: AuthUser,
        slug: &str,
        details: PropertyDetails,
    ) -> Result<Property, ApiError> {
        let existing = self.owned_property_by_slug(caller, slug).await?;
        details.validate()?;

        let property = self
            .store
            .update_property(existing.id, details.normalized())
            .await?;
        tracing::info!("User {} updated property {}", caller.id, property.slug);
        Ok(property)
    }

    pub async fn delete_property(&self, caller: AuthUser, slug: &str) -> Result<(), ApiError> {
        let existing = self.owned_property_by_slug(caller, slug).await?;

        if !self.store.delete_property(existing.id).await? {
            return Err(ApiError::NotFound("Property does not exist".to_string()));
        }

        tracing::info!("User {} deleted property {}", caller.id, slug);
        Ok(())
    }

    /// Replace all image slots of a property with the supplied references
    pub async fn upload_images(
        &self,
        caller: AuthUser,
        request: ImageUploadRequest,
    ) -> Result<Property, ApiError> {
        let existing = match self.store.find_property(request.property_id).await {
            Ok(property) => property,
            Err(StoreError::NotFound(_)) => {
                return Err(ApiError::NotFound("Property does not exist".to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        ensure_owner(&existing, caller)?;

        Ok(self.store.update_images(existing.id, request.images).await?)
    }

    /// Structured search over published listings
    pub async fn search(
        &self,
        caller: AuthUser,
        request: &SearchRequest,
    ) -> Result<Vec<Property>, ApiError> {
        let criteria = SearchCriteria::from_request(request, self.label_policy)?;
        let properties = self.store.search_properties(&criteria.to_predicate()).await?;

        tracing::debug!("Search by {} matched {} properties", caller.id, properties.len());
        Ok(properties)
    }

    /// Rate an agent and return the agent's refreshed aggregates
    pub async fn submit_rating(
        &self,
        caller: AuthUser,
        profile_id: Uuid,
        request: RatingRequest,
    ) -> Result<AgentProfile, ApiError> {
        let profile = match self.store.find_agent_profile(profile_id).await {
            Ok(profile) => profile,
            Err(StoreError::NotFound(_)) => {
                return Err(ApiError::NotFound("Agent profile not found".to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        ensure_not_self(caller.id, &profile)?;

        if self.store.rating_exists(caller.id, profile.id).await? {
            return Err(ApiError::Conflict("Profile already reviewed".to_string()));
        }

        validate_rating_value(request.rating)?;
        request.validate()?;

        let rating = NewRating {
            rater_id: caller.id,
            agent_id: profile.id,
            rating: request.rating,
            comment: request.comment,
        };

        let updated = match self.store.insert_rating(rating).await {
            Ok(updated) => updated,
            Err(StoreError::Duplicate(_)) => {
                return Err(ApiError::Conflict("Profile already reviewed".to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            "User {} rated agent {}: num_reviews={}, rating={:?}",
            caller.id,
            updated.id,
            updated.num_reviews,
            updated.rating
        );
        Ok(updated)
    }

    async fn owned_property_by_slug(&self, caller: AuthUser, slug: &str) -> Result<Property, ApiError> {
        let property = match self.store.find_property_by_slug(slug).await {
            Ok(property) => property,
            Err(StoreError::NotFound(_)) => {
                return Err(ApiError::NotFound("Property does not exist".to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        ensure_owner(&property, caller)?;
        Ok(property)
    }
}

fn ensure_owner(property: &Property, caller: AuthUser) -> Result<(), ApiError> {
    if property.is_owned_by(caller.id) {
        Ok(())
    } else {
        tracing::info!("User {} denied write access to {}", caller.id, property.slug);
        Err(ApiError::Forbidden(
            "You can't update or delete a property that doesn't belong to you".to_string(),
        ))
    }
}
