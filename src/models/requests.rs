use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::core::filters::{Page, PropertyFilter, SortOrder};
use crate::models::domain::PropertyImages;

/// Query string accepted by the property list endpoints
///
/// `GET /api/v1/properties/all?advert_type=for%20sale&price__gt=50000&search=nairobi&ordering=-created_at&page=2`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListPropertiesQuery {
    pub advert_type: Option<String>,
    pub property_type: Option<String>,
    pub price: Option<String>,
    #[serde(rename = "price__gt", alias = "price_gt")]
    pub price_gt: Option<String>,
    #[serde(rename = "price__lt", alias = "price_lt")]
    pub price_lt: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl ListPropertiesQuery {
    /// Convert the raw query into filter criteria, rejecting malformed numbers
    pub fn to_filter(&self) -> Result<PropertyFilter, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let filter = PropertyFilter {
            advert_type: non_blank(&self.advert_type),
            property_type: non_blank(&self.property_type),
            price: parse_decimal("price", &self.price, &mut errors),
            price_gt: parse_decimal("price__gt", &self.price_gt, &mut errors),
            price_lt: parse_decimal("price__lt", &self.price_lt, &mut errors),
            search: non_blank(&self.search),
            owner: None,
        };

        if errors.is_empty() {
            Ok(filter)
        } else {
            Err(errors)
        }
    }

    pub fn sort_order(&self) -> SortOrder {
        SortOrder::parse(self.ordering.as_deref())
    }

    /// Requested page, with the size clamped to `max_page_size`
    pub fn page(&self, default_page_size: u32, max_page_size: u32) -> Page {
        let size = self
            .page_size
            .unwrap_or(default_page_size)
            .clamp(1, max_page_size.max(1));
        Page::new(self.page.unwrap_or(1), size)
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_decimal(
    field: &'static str,
    value: &Option<String>,
    errors: &mut ValidationErrors,
) -> Option<BigDecimal> {
    let raw = non_blank(value)?;
    match raw.parse::<BigDecimal>() {
        Ok(number) => Some(number),
        Err(_) => {
            let mut err = ValidationError::new("invalid_number");
            err.message = Some(format!("Enter a number, got '{}'", raw).into());
            errors.add(field, err);
            None
        }
    }
}

/// Structured search payload
///
/// Every key is required; band labels are translated by `core::search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub advert_type: String,
    pub property_type: String,
    pub price: String,
    pub bedrooms: String,
    pub bathrooms: String,
    pub catch_phrase: String,
}

/// Image references for the five slots of a listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUploadRequest {
    pub property_id: Uuid,
    #[serde(flatten)]
    pub images: PropertyImages,
}

/// Rating submitted for an agent
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RatingRequest {
    pub rating: i16,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub comment: String,
}
