use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::time::Duration;
use uuid::Uuid;

use crate::config::DatabaseSettings;
use crate::core::{Page, Predicate, SortOrder};
use crate::models::{
    AdvertType, AgentProfile, NewProperty, NewRating, Property, PropertyDetails, PropertyImages,
    PropertyType, PropertyView, ViewOutcome,
};
use crate::services::store::{ListingStore, StoreError};

const PROPERTY_COLUMNS: &str = "id, user_id, title, slug, ref_code, description, country, city, \
    postal_code, street_address, property_number, price, tax, plot_area, total_floors, bedrooms, \
    bathrooms, advert_type, property_type, cover_photo, photo1, photo2, photo3, photo4, \
    published_status, views, created_at, updated_at";

const PROFILE_COLUMNS: &str = "id, user_id, is_agent, num_reviews, rating";

/// Share lock on the property row for the rest of the view transaction;
/// a concurrent delete blocks until the view is committed.
const LOCK_PROPERTY_SQL: &str = "SELECT 1 FROM properties WHERE id = $1 FOR SHARE";

/// PostgreSQL-backed listing store
///
/// Uniqueness of property views and ratings is enforced by table
/// constraints; the check-then-write paths use `ON CONFLICT DO NOTHING`
/// inside a transaction so concurrent duplicates cannot double count.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(settings: &DatabaseSettings) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            &settings.url,
            settings.max_connections.unwrap_or(10),
            settings.min_connections.unwrap_or(1),
            Duration::from_secs(settings.acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(settings.idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }
}

fn decode_label<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: std::str::FromStr<Err = crate::models::ParseLabelError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse::<T>().map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

fn property_from_row(row: &PgRow) -> Result<Property, sqlx::Error> {
    Ok(Property {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        slug: row.try_get("slug")?,
        ref_code: row.try_get("ref_code")?,
        details: PropertyDetails {
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            country: row.try_get("country")?,
            city: row.try_get("city")?,
            postal_code: row.try_get("postal_code")?,
            street_address: row.try_get("street_address")?,
            property_number: row.try_get("property_number")?,
            price: row.try_get("price")?,
            tax: row.try_get("tax")?,
            plot_area: row.try_get("plot_area")?,
            total_floors: row.try_get("total_floors")?,
            bedrooms: row.try_get("bedrooms")?,
            bathrooms: row.try_get("bathrooms")?,
            advert_type: decode_label::<AdvertType>(row, "advert_type")?,
            property_type: decode_label::<PropertyType>(row, "property_type")?,
            published_status: row.try_get("published_status")?,
        },
        images: PropertyImages {
            cover_photo: row.try_get("cover_photo")?,
            photo1: row.try_get("photo1")?,
            photo2: row.try_get("photo2")?,
            photo3: row.try_get("photo3")?,
            photo4: row.try_get("photo4")?,
        },
        views: row.try_get("views")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn profile_from_row(row: &PgRow) -> Result<AgentProfile, sqlx::Error> {
    Ok(AgentProfile {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        is_agent: row.try_get("is_agent")?,
        num_reviews: row.try_get("num_reviews")?,
        rating: row.try_get("rating")?,
    })
}

fn map_missing_property(err: sqlx::Error, property_id: Uuid) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_foreign_key_violation() {
            return StoreError::NotFound(format!("property {}", property_id));
        }
    }
    StoreError::SqlxError(err)
}

fn map_unique_violation(err: sqlx::Error, what: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::Duplicate(what.to_string());
        }
    }
    StoreError::SqlxError(err)
}

#[async_trait]
impl ListingStore for PostgresClient {
    async fn list_properties(
        &self,
        predicate: &Predicate,
        order: SortOrder,
        page: Page,
    ) -> Result<(Vec<Property>, i64), StoreError> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM properties WHERE ");
        predicate.push_sql(&mut count_query);
        let total: i64 = count_query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM properties WHERE ", PROPERTY_COLUMNS));
        predicate.push_sql(&mut query);
        query.push(" ORDER BY ").push(order.sql());
        query.push(" LIMIT ").push_bind(page.limit());
        query.push(" OFFSET ").push_bind(page.offset());

        let rows = query.build().fetch_all(&self.pool).await?;
        let properties = rows
            .iter()
            .map(property_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Listed {} of {} matching properties", properties.len(), total);

        Ok((properties, total))
    }

    async fn search_properties(&self, predicate: &Predicate) -> Result<Vec<Property>, StoreError> {
        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM properties WHERE ", PROPERTY_COLUMNS));
        predicate.push_sql(&mut query);
        query.push(" ORDER BY ").push(SortOrder::CreatedAsc.sql());

        let rows = query.build().fetch_all(&self.pool).await?;
        let properties = rows
            .iter()
            .map(property_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(properties)
    }

    async fn find_property(&self, id: Uuid) -> Result<Property, StoreError> {
        let query = format!("SELECT {} FROM properties WHERE id = $1", PROPERTY_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("property {}", id)))?;

        Ok(property_from_row(&row)?)
    }

    async fn find_property_by_slug(&self, slug: &str) -> Result<Property, StoreError> {
        let query = format!("SELECT {} FROM properties WHERE slug = $1", PROPERTY_COLUMNS);
        let row = sqlx::query(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("property '{}'", slug)))?;

        Ok(property_from_row(&row)?)
    }

    async fn create_property(&self, new: NewProperty) -> Result<Property, StoreError> {
        let query = format!(
            r#"
            INSERT INTO properties (
                id, user_id, title, slug, ref_code, description, country, city,
                postal_code, street_address, property_number, price, tax, plot_area,
                total_floors, bedrooms, bathrooms, advert_type, property_type,
                published_status, views, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20, 0, NOW(), NOW())
            RETURNING {}
            "#,
            PROPERTY_COLUMNS
        );

        let details = &new.details;
        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(new.user_id)
            .bind(&details.title)
            .bind(&new.slug)
            .bind(&new.ref_code)
            .bind(&details.description)
            .bind(&details.country)
            .bind(&details.city)
            .bind(&details.postal_code)
            .bind(&details.street_address)
            .bind(details.property_number)
            .bind(&details.price)
            .bind(&details.tax)
            .bind(&details.plot_area)
            .bind(details.total_floors)
            .bind(details.bedrooms)
            .bind(&details.bathrooms)
            .bind(details.advert_type.as_str())
            .bind(details.property_type.as_str())
            .bind(details.published_status)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, "property slug or reference code"))?;

        Ok(property_from_row(&row)?)
    }

    async fn update_property(&self, id: Uuid, details: PropertyDetails) -> Result<Property, StoreError> {
        let query = format!(
            r#"
            UPDATE properties SET
                title = $2, description = $3, country = $4, city = $5, postal_code = $6,
                street_address = $7, property_number = $8, price = $9, tax = $10,
                plot_area = $11, total_floors = $12, bedrooms = $13, bathrooms = $14,
                advert_type = $15, property_type = $16, published_status = $17,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PROPERTY_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(id)
            .bind(&details.title)
            .bind(&details.description)
            .bind(&details.country)
            .bind(&details.city)
            .bind(&details.postal_code)
            .bind(&details.street_address)
            .bind(details.property_number)
            .bind(&details.price)
            .bind(&details.tax)
            .bind(&details.plot_area)
            .bind(details.total_floors)
            .bind(details.bedrooms)
            .bind(&details.bathrooms)
            .bind(details.advert_type.as_str())
            .bind(details.property_type.as_str())
            .bind(details.published_status)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("property {}", id)))?;

        Ok(property_from_row(&row)?)
    }

    async fn update_images(&self, id: Uuid, images: PropertyImages) -> Result<Property, StoreError> {
        let query = format!(
            r#"
            UPDATE properties SET
                cover_photo = $2, photo1 = $3, photo2 = $4, photo3 = $5, photo4 = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PROPERTY_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(id)
            .bind(&images.cover_photo)
            .bind(&images.photo1)
            .bind(&images.photo2)
            .bind(&images.photo3)
            .bind(&images.photo4)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("property {}", id)))?;

        Ok(property_from_row(&row)?)
    }

    async fn delete_property(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM properties WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_view(&self, property_id: Uuid, ip: &str) -> Result<ViewOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query(LOCK_PROPERTY_SQL)
            .bind(property_id)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        if !exists {
            return Err(StoreError::NotFound(format!("property {}", property_id)));
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO property_views (id, property_id, ip, created_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (property_id, ip) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(property_id)
        .bind(ip)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_missing_property(e, property_id))?
        .rows_affected()
            == 1;

        if inserted {
            sqlx::query("UPDATE properties SET views = views + 1 WHERE id = $1")
                .bind(property_id)
                .execute(&mut *tx)
                .await?;
        }

        let query = format!("SELECT {} FROM properties WHERE id = $1", PROPERTY_COLUMNS);
        let row = sqlx::query(&query).bind(property_id).fetch_one(&mut *tx).await?;
        let property = property_from_row(&row)?;

        tx.commit().await?;

        tracing::debug!(
            "View of {} from {} ({})",
            property_id,
            ip,
            if inserted { "counted" } else { "repeat" }
        );

        Ok(ViewOutcome {
            property,
            recorded: inserted,
        })
    }

    async fn list_views(&self) -> Result<Vec<PropertyView>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, property_id, ip, created_at
            FROM property_views
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let views = rows
            .iter()
            .map(|row| {
                Ok(PropertyView {
                    id: row.try_get("id")?,
                    property_id: row.try_get("property_id")?,
                    ip: row.try_get("ip")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok(views)
    }

    async fn find_agent_profile(&self, id: Uuid) -> Result<AgentProfile, StoreError> {
        let query = format!("SELECT {} FROM profiles WHERE id = $1 AND is_agent", PROFILE_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("agent profile {}", id)))?;

        Ok(profile_from_row(&row)?)
    }

    async fn rating_exists(&self, rater_id: Uuid, agent_id: Uuid) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM ratings WHERE rater_id = $1 AND agent_id = $2)",
        )
        .bind(rater_id)
        .bind(agent_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn insert_rating(&self, rating: NewRating) -> Result<AgentProfile, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Serialises concurrent recomputations for the same agent
        let locked = sqlx::query("SELECT id FROM profiles WHERE id = $1 AND is_agent FOR UPDATE")
            .bind(rating.agent_id)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        if !locked {
            return Err(StoreError::NotFound(format!("agent profile {}", rating.agent_id)));
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO ratings (id, rater_id, agent_id, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (rater_id, agent_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(rating.rater_id)
        .bind(rating.agent_id)
        .bind(rating.rating)
        .bind(&rating.comment)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            return Err(StoreError::Duplicate(format!(
                "rating by {} for agent {}",
                rating.rater_id, rating.agent_id
            )));
        }

        let row = sqlx::query(
            r#"
            UPDATE profiles SET
                num_reviews = summary.total,
                rating = summary.average
            FROM (
                SELECT COUNT(*)::INTEGER AS total,
                       ROUND(AVG(rating)::NUMERIC, 2)::DOUBLE PRECISION AS average
                FROM ratings
                WHERE agent_id = $1
            ) AS summary
            WHERE profiles.id = $1
            RETURNING profiles.id, profiles.user_id, profiles.is_agent,
                      profiles.num_reviews, profiles.rating
            "#,
        )
        .bind(rating.agent_id)
        .fetch_one(&mut *tx)
        .await?;
        let profile = profile_from_row(&row)?;

        tx.commit().await?;

        tracing::info!(
            "Agent {} now has {} reviews (average {:?})",
            profile.id,
            profile.num_reviews,
            profile.rating
        );

        Ok(profile)
    }

    /// Health check for the database connection
    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
