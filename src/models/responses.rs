use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::{AgentProfile, Property};

/// Property as returned to clients, with the tax-inclusive price
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyResponse {
    #[serde(flatten)]
    pub property: Property,
    pub final_property_price: BigDecimal,
}

impl From<Property> for PropertyResponse {
    fn from(property: Property) -> Self {
        let final_property_price = property.final_price();
        Self {
            property,
            final_property_price,
        }
    }
}

/// One page of a listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub count: i64,
    pub page: u32,
    pub page_size: u32,
    pub results: Vec<T>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Delete response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

/// Confirmation returned after a rating is stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingResponse {
    pub message: String,
    pub agent_id: Uuid,
    pub num_reviews: i32,
    pub rating: Option<f64>,
}

impl RatingResponse {
    pub fn created(profile: &AgentProfile) -> Self {
        Self {
            message: "Review created successfully".to_string(),
            agent_id: profile.id,
            num_reviews: profile.num_reviews,
            rating: profile.rating,
        }
    }
}

/// Plain confirmation message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
