use bigdecimal::num_bigint::BigInt;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Error returned when a stored or submitted enum label is not recognised
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseLabelError {
    pub kind: &'static str,
    pub value: String,
}

/// Whether a listing is for sale, for rent or up for auction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdvertType {
    #[serde(rename = "For Sale", alias = "for-sale")]
    ForSale,
    #[serde(rename = "For Rent", alias = "for-rent")]
    ForRent,
    #[serde(rename = "Auction", alias = "auction")]
    Auction,
}

impl AdvertType {
    pub const ALL: [AdvertType; 3] = [AdvertType::ForSale, AdvertType::ForRent, AdvertType::Auction];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdvertType::ForSale => "For Sale",
            AdvertType::ForRent => "For Rent",
            AdvertType::Auction => "Auction",
        }
    }
}

impl fmt::Display for AdvertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdvertType {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', " ");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().to_lowercase() == normalized)
            .ok_or_else(|| ParseLabelError {
                kind: "advert type",
                value: s.to_string(),
            })
    }
}

/// Kind of building being listed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    #[serde(alias = "house")]
    House,
    #[serde(alias = "apartment")]
    Apartment,
    #[serde(rename = "Office Space", alias = "office")]
    Office,
    #[serde(alias = "warehouse")]
    Warehouse,
    #[serde(alias = "commercial")]
    Commercial,
    #[serde(alias = "other")]
    Other,
}

impl PropertyType {
    pub const ALL: [PropertyType; 6] = [
        PropertyType::House,
        PropertyType::Apartment,
        PropertyType::Office,
        PropertyType::Warehouse,
        PropertyType::Commercial,
        PropertyType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::House => "House",
            PropertyType::Apartment => "Apartment",
            PropertyType::Office => "Office Space",
            PropertyType::Warehouse => "Warehouse",
            PropertyType::Commercial => "Commercial",
            PropertyType::Other => "Other",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        if normalized == "office" {
            return Ok(PropertyType::Office);
        }
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().to_lowercase() == normalized)
            .ok_or_else(|| ParseLabelError {
                kind: "property type",
                value: s.to_string(),
            })
    }
}

/// Owner-editable listing fields.
///
/// Doubles as the create/update payload, so validation lives here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PropertyDetails {
    #[validate(length(min = 1, max = 250))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, max = 100))]
    pub country: String,
    #[validate(length(min = 1, max = 180))]
    pub city: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub postal_code: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub street_address: String,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub property_number: i32,
    #[serde(deserialize_with = "decimal_text")]
    #[validate(custom(function = "price_amount"))]
    pub price: BigDecimal,
    #[serde(default = "default_tax", deserialize_with = "decimal_text")]
    #[validate(custom(function = "tax_rate"))]
    pub tax: BigDecimal,
    #[serde(default, deserialize_with = "decimal_text")]
    #[validate(custom(function = "plot_area_size"))]
    pub plot_area: BigDecimal,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub total_floors: i32,
    #[validate(range(min = 0))]
    pub bedrooms: i32,
    #[serde(deserialize_with = "decimal_text")]
    #[validate(custom(function = "bathroom_count"))]
    pub bathrooms: BigDecimal,
    pub advert_type: AdvertType,
    pub property_type: PropertyType,
    #[serde(default)]
    pub published_status: bool,
}

/// Default tax rate applied to the listed price (15%)
pub fn default_tax() -> BigDecimal {
    BigDecimal::new(BigInt::from(15), 2)
}

// (precision, scale) of the NUMERIC columns backing each decimal field
const PRICE_DIGITS: (i64, i64) = (14, 2);
const TAX_DIGITS: (i64, i64) = (6, 2);
const PLOT_AREA_DIGITS: (i64, i64) = (10, 2);
const BATHROOM_DIGITS: (i64, i64) = (4, 1);

impl PropertyDetails {
    /// Pad decimal fields to their column scale so every store holds the
    /// same representation. Call after `validate()`.
    pub fn normalized(mut self) -> Self {
        self.price = self.price.with_scale(PRICE_DIGITS.1);
        self.tax = self.tax.with_scale(TAX_DIGITS.1);
        self.plot_area = self.plot_area.with_scale(PLOT_AREA_DIGITS.1);
        self.bathrooms = self.bathrooms.with_scale(BATHROOM_DIGITS.1);
        self
    }
}

/// Non-negative and representable as NUMERIC(precision, scale)
fn fits_numeric(value: &BigDecimal, (precision, scale): (i64, i64)) -> Result<(), ValidationError> {
    if *value < BigDecimal::from(0) {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("must be greater than or equal to 0".into());
        return Err(err);
    }

    let (_, value_scale) = value.normalized().as_bigint_and_exponent();
    if value_scale > scale {
        let mut err = ValidationError::new("decimal_places");
        err.message = Some(format!("must have at most {} decimal places", scale).into());
        return Err(err);
    }

    let integer_digits = precision - scale;
    let limit = BigDecimal::new(BigInt::from(1), -integer_digits);
    if *value >= limit {
        let mut err = ValidationError::new("max_digits");
        err.message = Some(format!("must have at most {} digits before the decimal point", integer_digits).into());
        return Err(err);
    }

    Ok(())
}

fn price_amount(value: &BigDecimal) -> Result<(), ValidationError> {
    fits_numeric(value, PRICE_DIGITS)
}

fn tax_rate(value: &BigDecimal) -> Result<(), ValidationError> {
    fits_numeric(value, TAX_DIGITS)
}

fn plot_area_size(value: &BigDecimal) -> Result<(), ValidationError> {
    fits_numeric(value, PLOT_AREA_DIGITS)
}

fn bathroom_count(value: &BigDecimal) -> Result<(), ValidationError> {
    fits_numeric(value, BATHROOM_DIGITS)
}

/// Read a decimal from a JSON number or numeric string without passing
/// through the binary value of a float
fn decimal_text<'de, D>(deserializer: D) -> Result<BigDecimal, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(DecimalVisitor)
}

struct DecimalVisitor;

impl<'de> Visitor<'de> for DecimalVisitor {
    type Value = BigDecimal;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal number or numeric string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(BigDecimal::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(BigDecimal::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        if !v.is_finite() {
            return Err(E::custom("decimal must be finite"));
        }
        // Display prints the shortest text that round-trips, e.g. 99.99
        BigDecimal::from_str(&v.to_string()).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        BigDecimal::from_str(v.trim()).map_err(E::custom)
    }
}

/// The five image slots of a listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyImages {
    #[serde(default)]
    pub cover_photo: Option<String>,
    #[serde(default)]
    pub photo1: Option<String>,
    #[serde(default)]
    pub photo2: Option<String>,
    #[serde(default)]
    pub photo3: Option<String>,
    #[serde(default)]
    pub photo4: Option<String>,
}

/// A property listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: Uuid,
    pub user_id: Uuid,
    pub slug: String,
    pub ref_code: String,
    #[serde(flatten)]
    pub details: PropertyDetails,
    #[serde(flatten)]
    pub images: PropertyImages,
    pub views: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Property {
    /// Listed price including tax
    pub fn final_price(&self) -> BigDecimal {
        &self.details.price + &self.details.price * &self.details.tax
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}

/// Everything needed to insert a new listing
#[derive(Debug, Clone)]
pub struct NewProperty {
    pub user_id: Uuid,
    pub slug: String,
    pub ref_code: String,
    pub details: PropertyDetails,
}

/// A deduplicated view of a property from one origin address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyView {
    pub id: Uuid,
    pub property_id: Uuid,
    pub ip: String,
    pub created_at: DateTime<Utc>,
}

/// Result of recording a view
#[derive(Debug, Clone)]
pub struct ViewOutcome {
    pub property: Property,
    /// False when the origin address had already viewed the property
    pub recorded: bool,
}

/// A rating left by a user for an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub id: Uuid,
    pub rater_id: Uuid,
    pub agent_id: Uuid,
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Rating to be inserted
#[derive(Debug, Clone)]
pub struct NewRating {
    pub rater_id: Uuid,
    pub agent_id: Uuid,
    pub rating: i16,
    pub comment: String,
}

/// Profile of a user account, with denormalized review aggregates when the
/// account belongs to an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub is_agent: bool,
    pub num_reviews: i32,
    pub rating: Option<f64>,
}
