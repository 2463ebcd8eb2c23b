use bigdecimal::BigDecimal;
use serde::Deserialize;
use thiserror::Error;

use crate::core::filters::{Field, Op, Predicate};
use crate::models::SearchRequest;

/// Price labels offered by the search form, with their minimum price
pub const PRICE_BANDS: [(&str, i64); 6] = [
    ("$0+", 0),
    ("$50,000+", 50_000),
    ("$100,000+", 100_000),
    ("$200,000+", 200_000),
    ("$400,000+", 400_000),
    ("$600,000+", 600_000),
];

/// Price label that disables the price filter
pub const ANY_PRICE: &str = "Any";

pub const BEDROOM_BANDS: [(&str, i32); 6] = [
    ("0+", 0),
    ("1+", 1),
    ("2+", 2),
    ("3+", 3),
    ("4+", 4),
    ("5+", 5),
];

pub const BATHROOM_BANDS: [(&str, i32); 5] = [("0+", 0), ("1+", 1), ("2+", 2), ("3+", 3), ("4+", 4)];

/// How labels outside the band vocabulary are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelPolicy {
    /// Unknown labels are rejected
    #[default]
    Strict,
    /// Unknown labels are read as raw numbers, falling back to no price
    /// filter and a zero room threshold, as older clients expect
    Legacy,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("'{label}' is not a valid {field} option")]
    UnknownLabel { field: &'static str, label: String },
}

impl SearchError {
    pub fn field(&self) -> &'static str {
        match self {
            SearchError::UnknownLabel { field, .. } => field,
        }
    }
}

fn lookup<T: Copy>(bands: &[(&str, T)], label: &str) -> Option<T> {
    bands.iter().find(|(l, _)| *l == label).map(|(_, v)| *v)
}

fn unknown(field: &'static str, label: &str) -> SearchError {
    SearchError::UnknownLabel {
        field,
        label: label.to_string(),
    }
}

/// Minimum price for a price label; `None` means no price filter
pub fn price_threshold(label: &str, policy: LabelPolicy) -> Result<Option<BigDecimal>, SearchError> {
    if label == ANY_PRICE {
        return Ok(None);
    }
    if let Some(threshold) = lookup(&PRICE_BANDS, label) {
        return Ok(Some(BigDecimal::from(threshold)));
    }
    match policy {
        LabelPolicy::Strict => Err(unknown("price", label)),
        LabelPolicy::Legacy => {
            let raw = label.trim().parse::<BigDecimal>().ok();
            if raw.is_none() {
                tracing::debug!("Ignoring unrecognised price label '{}'", label);
            }
            Ok(raw)
        }
    }
}

pub fn bedroom_threshold(label: &str, policy: LabelPolicy) -> Result<i32, SearchError> {
    if let Some(threshold) = lookup(&BEDROOM_BANDS, label) {
        return Ok(threshold);
    }
    match policy {
        LabelPolicy::Strict => Err(unknown("bedrooms", label)),
        LabelPolicy::Legacy => Ok(label.trim().parse::<i32>().unwrap_or(0)),
    }
}

pub fn bathroom_threshold(label: &str, policy: LabelPolicy) -> Result<BigDecimal, SearchError> {
    if let Some(threshold) = lookup(&BATHROOM_BANDS, label) {
        return Ok(BigDecimal::from(threshold));
    }
    match policy {
        LabelPolicy::Strict => Err(unknown("bathrooms", label)),
        LabelPolicy::Legacy => Ok(label
            .trim()
            .parse::<BigDecimal>()
            .unwrap_or_else(|_| BigDecimal::from(0))),
    }
}

/// Search request with every band label resolved to a threshold
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCriteria {
    pub advert_type: String,
    pub property_type: String,
    pub min_price: Option<BigDecimal>,
    pub min_bedrooms: i32,
    pub min_bathrooms: BigDecimal,
    pub catch_phrase: String,
}

impl SearchCriteria {
    pub fn from_request(request: &SearchRequest, policy: LabelPolicy) -> Result<Self, SearchError> {
        Ok(Self {
            advert_type: request.advert_type.clone(),
            property_type: request.property_type.clone(),
            min_price: price_threshold(&request.price, policy)?,
            min_bedrooms: bedroom_threshold(&request.bedrooms, policy)?,
            min_bathrooms: bathroom_threshold(&request.bathrooms, policy)?,
            catch_phrase: request.catch_phrase.clone(),
        })
    }

    /// Published listings matching every criterion
    pub fn to_predicate(&self) -> Predicate {
        let mut predicate = Predicate::when(Field::Published, Op::Eq, true)
            .and(Predicate::when(Field::AdvertType, Op::IExact, self.advert_type.as_str()))
            .and(Predicate::when(Field::PropertyType, Op::IExact, self.property_type.as_str()));

        if let Some(min_price) = &self.min_price {
            predicate = predicate.and(Predicate::when(Field::Price, Op::Gte, min_price.clone()));
        }

        predicate
            .and(Predicate::when(Field::Bedrooms, Op::Gte, self.min_bedrooms))
            .and(Predicate::when(Field::Bathrooms, Op::Gte, self.min_bathrooms.clone()))
            .and(Predicate::when(Field::Description, Op::IContains, self.catch_phrase.as_str()))
    }
}
