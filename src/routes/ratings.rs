use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{RatingRequest, RatingResponse};
use crate::routes::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/ratings/{profile_id}", web::post().to(create_agent_review));
}

/// POST /api/v1/ratings/{profile_id}
///
/// Request body:
/// ```json
/// {
///   "rating": 4,
///   "comment": "string"
/// }
/// ```
async fn create_agent_review(
    user: AuthUser,
    state: web::Data<AppState>,
    profile_id: web::Path<Uuid>,
    body: web::Json<RatingRequest>,
) -> Result<HttpResponse, ApiError> {
    let profile = state
        .listings
        .submit_rating(user, profile_id.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(RatingResponse::created(&profile)))
}
