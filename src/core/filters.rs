//! Composable predicates over property listings.
//!
//! A [`Predicate`] is a tree of field/operator/value conditions joined by
//! AND/OR. The same tree is evaluated in memory with [`Predicate::matches`]
//! and rendered into a parameterised SQL `WHERE` clause with
//! [`Predicate::push_sql`], so both stores filter identically.

use bigdecimal::BigDecimal;
use sqlx::{Postgres, QueryBuilder};
use std::cmp::Ordering;
use uuid::Uuid;

use crate::models::Property;

/// Filterable property columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    AdvertType,
    PropertyType,
    Price,
    Bedrooms,
    Bathrooms,
    Description,
    Country,
    City,
    Published,
    Owner,
}

impl Field {
    pub fn column(self) -> &'static str {
        match self {
            Field::AdvertType => "advert_type",
            Field::PropertyType => "property_type",
            Field::Price => "price",
            Field::Bedrooms => "bedrooms",
            Field::Bathrooms => "bathrooms",
            Field::Description => "description",
            Field::Country => "country",
            Field::City => "city",
            Field::Published => "published_status",
            Field::Owner => "user_id",
        }
    }

    fn value_of(self, property: &Property) -> Value {
        let details = &property.details;
        match self {
            Field::AdvertType => Value::Text(details.advert_type.as_str().to_string()),
            Field::PropertyType => Value::Text(details.property_type.as_str().to_string()),
            Field::Price => Value::Decimal(details.price.clone()),
            Field::Bedrooms => Value::Integer(details.bedrooms),
            Field::Bathrooms => Value::Decimal(details.bathrooms.clone()),
            Field::Description => Value::Text(details.description.clone()),
            Field::Country => Value::Text(details.country.clone()),
            Field::City => Value::Text(details.city.clone()),
            Field::Published => Value::Bool(details.published_status),
            Field::Owner => Value::Id(property.user_id),
        }
    }
}

/// Comparison applied by a [`Condition`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Case-insensitive equality
    IExact,
    Eq,
    Gt,
    Lt,
    Gte,
    /// Case-insensitive substring
    IContains,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Decimal(BigDecimal),
    Integer(i32),
    Bool(bool),
    Id(Uuid),
}

impl Value {
    fn as_decimal(&self) -> Option<BigDecimal> {
        match self {
            Value::Decimal(d) => Some(d.clone()),
            Value::Integer(i) => Some(BigDecimal::from(*i)),
            _ => None,
        }
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Id(a), Value::Id(b)) => Some(a.cmp(b)),
            _ => self.as_decimal()?.partial_cmp(&other.as_decimal()?),
        }
    }

    fn push_bind(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Value::Text(s) => qb.push_bind(s.clone()),
            Value::Decimal(d) => qb.push_bind(d.clone()),
            Value::Integer(i) => qb.push_bind(*i),
            Value::Bool(b) => qb.push_bind(*b),
            Value::Id(id) => qb.push_bind(*id),
        };
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<BigDecimal> for Value {
    fn from(value: BigDecimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Value::Id(value)
    }
}

/// A single `field op value` test
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: Field,
    pub op: Op,
    pub value: Value,
}

impl Condition {
    pub fn new(field: Field, op: Op, value: impl Into<Value>) -> Self {
        Self {
            field,
            op,
            value: value.into(),
        }
    }

    pub fn matches(&self, property: &Property) -> bool {
        let actual = self.field.value_of(property);
        match self.op {
            Op::IExact => match (actual.as_text(), self.value.as_text()) {
                (Some(a), Some(b)) => a.to_lowercase() == b.to_lowercase(),
                _ => false,
            },
            Op::IContains => match (actual.as_text(), self.value.as_text()) {
                (Some(a), Some(b)) => a.to_lowercase().contains(&b.to_lowercase()),
                _ => false,
            },
            Op::Eq => actual.compare(&self.value) == Some(Ordering::Equal),
            Op::Gt => actual.compare(&self.value) == Some(Ordering::Greater),
            Op::Lt => actual.compare(&self.value) == Some(Ordering::Less),
            Op::Gte => matches!(
                actual.compare(&self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        }
    }

    fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        let column = self.field.column();
        match self.op {
            Op::IExact => {
                qb.push(format!("LOWER({}) = LOWER(", column));
                self.value.push_bind(qb);
                qb.push(")");
            }
            Op::IContains => {
                let needle = self.value.as_text().unwrap_or_default();
                qb.push(format!("{} ILIKE ", column));
                qb.push_bind(format!("%{}%", escape_like(needle)));
                qb.push(" ESCAPE '\\'");
            }
            Op::Eq | Op::Gt | Op::Lt | Op::Gte => {
                let symbol = match self.op {
                    Op::Eq => "=",
                    Op::Gt => ">",
                    Op::Lt => "<",
                    _ => ">=",
                };
                qb.push(format!("{} {} ", column, symbol));
                self.value.push_bind(qb);
            }
        }
    }
}

/// Escape LIKE wildcards so user input is matched literally
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Boolean combination of conditions
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Condition(Condition),
    /// Every child must hold; empty means "no constraint"
    All(Vec<Predicate>),
    /// At least one child must hold; empty never holds
    Any(Vec<Predicate>),
}

impl Default for Predicate {
    fn default() -> Self {
        Predicate::All(Vec::new())
    }
}

impl From<Condition> for Predicate {
    fn from(condition: Condition) -> Self {
        Predicate::Condition(condition)
    }
}

impl Predicate {
    /// Predicate that accepts every property
    pub fn always() -> Self {
        Self::default()
    }

    pub fn when(field: Field, op: Op, value: impl Into<Value>) -> Self {
        Predicate::Condition(Condition::new(field, op, value))
    }

    /// Conjunction, flattening nested `All`s
    pub fn and(self, other: impl Into<Predicate>) -> Self {
        let other = other.into();
        match (self, other) {
            (Predicate::All(mut left), Predicate::All(right)) => {
                left.extend(right);
                Predicate::All(left)
            }
            (Predicate::All(mut left), other) => {
                left.push(other);
                Predicate::All(left)
            }
            (this, Predicate::All(mut right)) => {
                right.insert(0, this);
                Predicate::All(right)
            }
            (this, other) => Predicate::All(vec![this, other]),
        }
    }

    /// Disjunction, flattening nested `Any`s
    pub fn or(self, other: impl Into<Predicate>) -> Self {
        let other = other.into();
        match (self, other) {
            (Predicate::Any(mut left), Predicate::Any(right)) => {
                left.extend(right);
                Predicate::Any(left)
            }
            (Predicate::Any(mut left), other) => {
                left.push(other);
                Predicate::Any(left)
            }
            (this, other) => Predicate::Any(vec![this, other]),
        }
    }

    #[inline]
    pub fn matches(&self, property: &Property) -> bool {
        match self {
            Predicate::Condition(condition) => condition.matches(property),
            Predicate::All(children) => children.iter().all(|p| p.matches(property)),
            Predicate::Any(children) => children.iter().any(|p| p.matches(property)),
        }
    }

    /// Keep the properties accepted by this predicate, preserving order
    pub fn apply<'a, I>(&self, properties: I) -> Vec<Property>
    where
        I: IntoIterator<Item = &'a Property>,
    {
        properties
            .into_iter()
            .filter(|p| self.matches(p))
            .cloned()
            .collect()
    }

    /// Append this predicate as a SQL boolean expression
    pub fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Predicate::Condition(condition) => condition.push_sql(qb),
            Predicate::All(children) if children.is_empty() => {
                qb.push("TRUE");
            }
            Predicate::Any(children) if children.is_empty() => {
                qb.push("FALSE");
            }
            Predicate::All(children) | Predicate::Any(children) => {
                let joiner = if matches!(self, Predicate::All(_)) {
                    " AND "
                } else {
                    " OR "
                };
                qb.push("(");
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        qb.push(joiner);
                    }
                    child.push_sql(qb);
                }
                qb.push(")");
            }
        }
    }
}

/// Criteria accepted by the property list endpoints
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyFilter {
    pub advert_type: Option<String>,
    pub property_type: Option<String>,
    pub price: Option<BigDecimal>,
    pub price_gt: Option<BigDecimal>,
    pub price_lt: Option<BigDecimal>,
    /// Whitespace/comma separated terms, each matched against country or city
    pub search: Option<String>,
    pub owner: Option<Uuid>,
}

impl PropertyFilter {
    pub fn owned_by(mut self, owner: Uuid) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn to_predicate(&self) -> Predicate {
        let mut predicate = Predicate::always();

        if let Some(owner) = self.owner {
            predicate = predicate.and(Predicate::when(Field::Owner, Op::Eq, owner));
        }
        if let Some(advert_type) = &self.advert_type {
            predicate = predicate.and(Predicate::when(Field::AdvertType, Op::IExact, advert_type.as_str()));
        }
        if let Some(property_type) = &self.property_type {
            predicate = predicate.and(Predicate::when(Field::PropertyType, Op::IExact, property_type.as_str()));
        }
        if let Some(price) = &self.price {
            predicate = predicate.and(Predicate::when(Field::Price, Op::Eq, price.clone()));
        }
        if let Some(price) = &self.price_gt {
            predicate = predicate.and(Predicate::when(Field::Price, Op::Gt, price.clone()));
        }
        if let Some(price) = &self.price_lt {
            predicate = predicate.and(Predicate::when(Field::Price, Op::Lt, price.clone()));
        }
        if let Some(search) = &self.search {
            for term in search_terms(search) {
                let either = Predicate::when(Field::Country, Op::IContains, term)
                    .or(Predicate::when(Field::City, Op::IContains, term));
                predicate = predicate.and(either);
            }
        }

        predicate
    }
}

fn search_terms(search: &str) -> impl Iterator<Item = &str> {
    search
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|term| !term.is_empty())
}

/// Direction of the `created_at` ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    CreatedAsc,
    #[default]
    CreatedDesc,
}

impl SortOrder {
    /// Parse an `ordering` parameter; unknown fields fall back to newest first
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        raw.split(',')
            .map(str::trim)
            .find_map(|field| match field {
                "created_at" => Some(SortOrder::CreatedAsc),
                "-created_at" => Some(SortOrder::CreatedDesc),
                _ => None,
            })
            .unwrap_or_default()
    }

    pub fn sql(self) -> &'static str {
        match self {
            SortOrder::CreatedAsc => "created_at ASC, id ASC",
            SortOrder::CreatedDesc => "created_at DESC, id DESC",
        }
    }

    pub fn sort(self, properties: &mut [Property]) {
        match self {
            SortOrder::CreatedAsc => {
                properties.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
            }
            SortOrder::CreatedDesc => {
                properties.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)))
            }
        }
    }
}

/// 1-based page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    pub fn new(number: u32, size: u32) -> Self {
        Self {
            number: number.max(1),
            size: size.max(1),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.number as i64 - 1) * self.size as i64
    }

    pub fn limit(&self) -> i64 {
        self.size as i64
    }
}
