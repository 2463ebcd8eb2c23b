use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::core::{Page, Predicate, RatingSummary, SortOrder};
use crate::models::{
    AgentProfile, NewProperty, NewRating, Property, PropertyDetails, PropertyImages, PropertyView,
    Rating, ViewOutcome,
};
use crate::services::store::{ListingStore, StoreError};

#[derive(Default)]
struct MemoryState {
    /// Kept in insertion (creation) order
    properties: Vec<Property>,
    views: Vec<PropertyView>,
    view_keys: HashSet<(Uuid, String)>,
    profiles: HashMap<Uuid, AgentProfile>,
    ratings: Vec<Rating>,
    rating_keys: HashSet<(Uuid, Uuid)>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl MemoryState {
    /// Strictly increasing timestamps so creation order is never ambiguous
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts
    }

    fn property_index(&self, id: Uuid) -> Result<usize, StoreError> {
        self.properties
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("property {}", id)))
    }
}

/// In-process listing store
///
/// Every operation runs under one lock, which makes the view and rating
/// check-then-write sequences atomic. Used for development and tests.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a profile (profiles are owned by the accounts service)
    pub async fn insert_profile(&self, profile: AgentProfile) {
        let mut state = self.state.lock().await;
        state.profiles.insert(profile.id, profile);
    }

    pub async fn profile(&self, id: Uuid) -> Option<AgentProfile> {
        self.state.lock().await.profiles.get(&id).cloned()
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn list_properties(
        &self,
        predicate: &Predicate,
        order: SortOrder,
        page: Page,
    ) -> Result<(Vec<Property>, i64), StoreError> {
        let state = self.state.lock().await;
        let mut matching = predicate.apply(&state.properties);
        drop(state);

        order.sort(&mut matching);
        let total = matching.len() as i64;
        let results = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();

        Ok((results, total))
    }

    async fn search_properties(&self, predicate: &Predicate) -> Result<Vec<Property>, StoreError> {
        let state = self.state.lock().await;
        Ok(predicate.apply(&state.properties))
    }

    async fn find_property(&self, id: Uuid) -> Result<Property, StoreError> {
        let state = self.state.lock().await;
        let index = state.property_index(id)?;
        Ok(state.properties[index].clone())
    }

    async fn find_property_by_slug(&self, slug: &str) -> Result<Property, StoreError> {
        let state = self.state.lock().await;
        state
            .properties
            .iter()
            .find(|p| p.slug == slug)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("property '{}'", slug)))
    }

    async fn create_property(&self, new: NewProperty) -> Result<Property, StoreError> {
        let mut state = self.state.lock().await;

        if state
            .properties
            .iter()
            .any(|p| p.slug == new.slug || p.ref_code == new.ref_code)
        {
            return Err(StoreError::Duplicate("property slug or reference code".to_string()));
        }

        let now = state.next_timestamp();
        let property = Property {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            slug: new.slug,
            ref_code: new.ref_code,
            details: new.details,
            images: PropertyImages::default(),
            views: 0,
            created_at: now,
            updated_at: now,
        };
        state.properties.push(property.clone());

        Ok(property)
    }

    async fn update_property(&self, id: Uuid, details: PropertyDetails) -> Result<Property, StoreError> {
        let mut state = self.state.lock().await;
        let index = state.property_index(id)?;
        let now = state.next_timestamp();

        let property = &mut state.properties[index];
        property.details = details;
        property.updated_at = now;

        Ok(property.clone())
    }

    async fn update_images(&self, id: Uuid, images: PropertyImages) -> Result<Property, StoreError> {
        let mut state = self.state.lock().await;
        let index = state.property_index(id)?;
        let now = state.next_timestamp();

        let property = &mut state.properties[index];
        property.images = images;
        property.updated_at = now;

        Ok(property.clone())
    }

    async fn delete_property(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let before = state.properties.len();
        state.properties.retain(|p| p.id != id);
        let deleted = state.properties.len() < before;

        if deleted {
            state.views.retain(|v| v.property_id != id);
            state.view_keys.retain(|(property_id, _)| *property_id != id);
        }

        Ok(deleted)
    }

    async fn record_view(&self, property_id: Uuid, ip: &str) -> Result<ViewOutcome, StoreError> {
        let mut state = self.state.lock().await;
        let index = state.property_index(property_id)?;

        let recorded = state.view_keys.insert((property_id, ip.to_string()));
        if recorded {
            let created_at = state.next_timestamp();
            state.views.push(PropertyView {
                id: Uuid::new_v4(),
                property_id,
                ip: ip.to_string(),
                created_at,
            });
            state.properties[index].views += 1;
        }

        Ok(ViewOutcome {
            property: state.properties[index].clone(),
            recorded,
        })
    }

    async fn list_views(&self) -> Result<Vec<PropertyView>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.views.iter().rev().cloned().collect())
    }

    async fn find_agent_profile(&self, id: Uuid) -> Result<AgentProfile, StoreError> {
        let state = self.state.lock().await;
        state
            .profiles
            .get(&id)
            .filter(|p| p.is_agent)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("agent profile {}", id)))
    }

    async fn rating_exists(&self, rater_id: Uuid, agent_id: Uuid) -> Result<bool, StoreError> {
        let state = self.state.lock().await;
        Ok(state.rating_keys.contains(&(rater_id, agent_id)))
    }

    async fn insert_rating(&self, rating: NewRating) -> Result<AgentProfile, StoreError> {
        let mut state = self.state.lock().await;

        if !state.profiles.get(&rating.agent_id).is_some_and(|p| p.is_agent) {
            return Err(StoreError::NotFound(format!("agent profile {}", rating.agent_id)));
        }
        if !state.rating_keys.insert((rating.rater_id, rating.agent_id)) {
            return Err(StoreError::Duplicate(format!(
                "rating by {} for agent {}",
                rating.rater_id, rating.agent_id
            )));
        }

        let created_at = state.next_timestamp();
        state.ratings.push(Rating {
            id: Uuid::new_v4(),
            rater_id: rating.rater_id,
            agent_id: rating.agent_id,
            rating: rating.rating,
            comment: rating.comment,
            created_at,
        });

        let summary = RatingSummary::from_values(
            state
                .ratings
                .iter()
                .filter(|r| r.agent_id == rating.agent_id)
                .map(|r| r.rating),
        );

        let profile = state
            .profiles
            .get_mut(&rating.agent_id)
            .ok_or_else(|| StoreError::NotFound(format!("agent profile {}", rating.agent_id)))?;
        summary.apply_to(profile);

        Ok(profile.clone())
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}
