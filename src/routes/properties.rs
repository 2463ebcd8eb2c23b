use actix_web::{web, HttpRequest, HttpResponse};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{
    DeleteResponse, ImageUploadRequest, ListPropertiesQuery, MessageResponse, PaginatedResponse,
    PropertyDetails, PropertyResponse, SearchRequest,
};
use crate::routes::AppState;

/// Configure all property routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/properties/all", web::get().to(list_all_properties))
        .route("/properties/agents", web::get().to(list_agent_properties))
        .route("/properties/views", web::get().to(list_property_views))
        .route("/properties/details/{slug}", web::get().to(property_detail))
        .route("/properties/update/{slug}", web::put().to(update_property))
        .route("/properties/create", web::post().to(create_property))
        .route("/properties/delete/{slug}", web::delete().to(delete_property))
        .route("/properties/upload-image", web::post().to(upload_property_image))
        .route("/properties/search", web::post().to(search_properties));
}

/// Origin address used to deduplicate views: the first `X-Forwarded-For`
/// entry when present, else the peer address
pub fn origin_address(req: &HttpRequest) -> String {
    let forwarded = req
        .headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match forwarded {
        Some(address) => address.to_string(),
        None => req
            .peer_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    }
}

async fn paginated(
    state: &AppState,
    query: &ListPropertiesQuery,
    owner: Option<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    let mut filter = query.to_filter()?;
    if let Some(owner) = owner {
        filter = filter.owned_by(owner.id);
    }
    let page = query.page(
        state.pagination.default_page_size,
        state.pagination.max_page_size,
    );

    let (properties, count) = state
        .listings
        .list_properties(&filter, query.sort_order(), page)
        .await?;

    Ok(HttpResponse::Ok().json(PaginatedResponse {
        count,
        page: page.number,
        page_size: page.size,
        results: properties
            .into_iter()
            .map(PropertyResponse::from)
            .collect::<Vec<_>>(),
    }))
}

/// GET /api/v1/properties/all
///
/// Filters: `advert_type`, `property_type`, `price`, `price__gt`, `price__lt`,
/// `search` (country or city), `ordering` (`created_at` / `-created_at`)
async fn list_all_properties(
    state: web::Data<AppState>,
    query: web::Query<ListPropertiesQuery>,
) -> Result<HttpResponse, ApiError> {
    paginated(&state, &query, None).await
}

/// GET /api/v1/properties/agents
///
/// Same filters as `/properties/all`, restricted to the caller's listings
async fn list_agent_properties(
    user: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<ListPropertiesQuery>,
) -> Result<HttpResponse, ApiError> {
    paginated(&state, &query, Some(user)).await
}

async fn list_property_views(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let views = state.listings.list_views().await?;
    Ok(HttpResponse::Ok().json(views))
}

/// GET /api/v1/properties/details/{slug}
///
/// Counts one view per origin address.
async fn property_detail(
    state: web::Data<AppState>,
    slug: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let origin = origin_address(&req);
    let property = state.listings.view_property(&slug, &origin).await?;
    Ok(HttpResponse::Ok().json(PropertyResponse::from(property)))
}

async fn update_property(
    user: AuthUser,
    state: web::Data<AppState>,
    slug: web::Path<String>,
    body: web::Json<PropertyDetails>,
) -> Result<HttpResponse, ApiError> {
    let property = state
        .listings
        .update_property(user, &slug, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(PropertyResponse::from(property)))
}

async fn create_property(
    user: AuthUser,
    state: web::Data<AppState>,
    body: web::Json<PropertyDetails>,
) -> Result<HttpResponse, ApiError> {
    let property = state.listings.create_property(user, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(PropertyResponse::from(property)))
}

async fn delete_property(
    user: AuthUser,
    state: web::Data<AppState>,
    slug: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    state.listings.delete_property(user, &slug).await?;
    Ok(HttpResponse::Ok().json(DeleteResponse {
        success: Some("Property deleted successfully".to_string()),
        failure: None,
    }))
}

/// POST /api/v1/properties/upload-image
///
/// Request body:
/// ```json
/// {
///   "property_id": "uuid",
///   "cover_photo": "string",
///   "photo1": "string"
/// }
/// ```
/// Slots missing from the body are cleared.
async fn upload_property_image(
    user: AuthUser,
    state: web::Data<AppState>,
    body: web::Json<ImageUploadRequest>,
) -> Result<HttpResponse, ApiError> {
    state.listings.upload_images(user, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Image uploaded".to_string(),
    }))
}

/// POST /api/v1/properties/search
///
/// Request body:
/// ```json
/// {
///   "advert_type": "For Sale",
///   "property_type": "House",
///   "price": "$100,000+",
///   "bedrooms": "2+",
///   "bathrooms": "1+",
///   "catch_phrase": "garden"
/// }
/// ```
async fn search_properties(
    user: AuthUser,
    state: web::Data<AppState>,
    body: web::Json<SearchRequest>,
) -> Result<HttpResponse, ApiError> {
    let properties = state.listings.search(user, &body).await?;
    Ok(HttpResponse::Ok().json(
        properties
            .into_iter()
            .map(PropertyResponse::from)
            .collect::<Vec<_>>(),
    ))
}
