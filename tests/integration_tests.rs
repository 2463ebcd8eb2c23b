// Integration tests for the realty listings HTTP API

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use bigdecimal::BigDecimal;
use realty_listings::config::PaginationSettings;
use realty_listings::core::LabelPolicy;
use realty_listings::error::{handle_json_payload_error, handle_path_error, handle_query_payload_error};
use realty_listings::routes::{configure_routes, AppState};
use realty_listings::{AgentProfile, JwtVerifier, ListingService, MemoryStore};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

const SECRET: &str = "integration-secret";

fn build_app(
    store: Arc<MemoryStore>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let state = AppState {
        listings: Arc::new(ListingService::new(store, LabelPolicy::Strict)),
        pagination: PaginationSettings::default(),
    };

    App::new()
        .app_data(web::Data::new(state))
        .app_data(web::Data::new(JwtVerifier::new(SECRET, 0)))
        .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
        .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
        .app_data(web::PathConfig::default().error_handler(handle_path_error))
        .configure(configure_routes)
}

fn bearer(user_id: Uuid) -> (&'static str, String) {
    let token = JwtVerifier::new(SECRET, 0).issue(user_id, 3600).unwrap();
    ("Authorization", format!("Bearer {}", token))
}

fn listing(title: &str, city: &str, price: i64) -> Value {
    json!({
        "title": title,
        "description": "Bright rooms and a large garden",
        "country": "Kenya",
        "city": city,
        "postal_code": "00100",
        "street_address": "Ngong Road",
        "property_number": 7,
        "price": price,
        "plot_area": 450,
        "total_floors": 2,
        "bedrooms": 3,
        "bathrooms": 2,
        "advert_type": "For Sale",
        "property_type": "House",
        "published_status": true
    })
}

fn search_body(price: &str) -> Value {
    json!({
        "advert_type": "For Sale",
        "property_type": "House",
        "price": price,
        "bedrooms": "0+",
        "bathrooms": "0+",
        "catch_phrase": ""
    })
}

fn decimal(value: &Value) -> BigDecimal {
    value.as_str().unwrap().parse().unwrap()
}

macro_rules! create {
    ($app:expr, $owner:expr, $body:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/v1/properties/create")
            .insert_header(bearer($owner))
            .set_json($body)
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        body
    }};
}

#[actix_web::test]
async fn test_health() {
    let app = test::init_service(build_app(Arc::new(MemoryStore::new()))).await;

    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "healthy");
}

#[actix_web::test]
async fn test_create_requires_authentication() {
    let app = test::init_service(build_app(Arc::new(MemoryStore::new()))).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/properties/create")
        .set_json(listing("Garden House", "Nairobi", 100_000))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "unauthorized");
    assert_eq!(body["status_code"], 401);
}

#[actix_web::test]
async fn test_create_returns_property_with_final_price() {
    let app = test::init_service(build_app(Arc::new(MemoryStore::new()))).await;
    let owner = Uuid::new_v4();

    let body = create!(app, owner, listing("Garden House", "Nairobi", 100_000));

    assert_eq!(body["user_id"], owner.to_string());
    assert!(body["slug"].as_str().unwrap().starts_with("garden-house-"));
    assert_eq!(body["views"], 0);
    assert_eq!(decimal(&body["final_property_price"]), BigDecimal::from(115_000));
}

#[actix_web::test]
async fn test_create_rejects_invalid_payloads() {
    let app = test::init_service(build_app(Arc::new(MemoryStore::new()))).await;
    let owner = Uuid::new_v4();

    let mut negative = listing("Garden House", "Nairobi", 100_000);
    negative["price"] = json!(-5);
    let req = test::TestRequest::post()
        .uri("/api/v1/properties/create")
        .insert_header(bearer(owner))
        .set_json(negative)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "validation_error");
    assert!(body["details"]["price"].is_array());

    let req = test::TestRequest::post()
        .uri("/api/v1/properties/create")
        .insert_header(bearer(owner))
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_fractional_json_price_kept_exact() {
    let app = test::init_service(build_app(Arc::new(MemoryStore::new()))).await;
    let owner = Uuid::new_v4();

    let mut studio = listing("Studio", "Nairobi", 0);
    studio["price"] = json!(99.99);
    studio["bathrooms"] = json!(1.5);
    let body = create!(app, owner, studio);

    assert_eq!(body["price"], "99.99");
    assert_eq!(body["bathrooms"], "1.5");
    assert_eq!(
        decimal(&body["final_property_price"]),
        "114.9885".parse::<BigDecimal>().unwrap()
    );

    let req = test::TestRequest::get()
        .uri("/api/v1/properties/all?price=99.99")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["title"], "Studio");
}

#[actix_web::test]
async fn test_out_of_range_decimals_rejected_before_storage() {
    let app = test::init_service(build_app(Arc::new(MemoryStore::new()))).await;
    let owner = Uuid::new_v4();

    let mut huge = listing("Garden House", "Nairobi", 100_000);
    huge["price"] = json!(1e15);
    huge["bathrooms"] = json!("2.25");
    let req = test::TestRequest::post()
        .uri("/api/v1/properties/create")
        .insert_header(bearer(owner))
        .set_json(huge)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "validation_error");
    assert!(body["details"]["price"].is_array());
    assert!(body["details"]["bathrooms"].is_array());
}

#[actix_web::test]
async fn test_list_all_newest_first_without_filters() {
    let app = test::init_service(build_app(Arc::new(MemoryStore::new()))).await;
    let owner = Uuid::new_v4();

    let first = create!(app, owner, listing("First", "Nairobi", 50_000));
    let second = create!(app, owner, listing("Second", "Mombasa", 60_000));
    let third = create!(app, owner, listing("Third", "Kisumu", 70_000));

    let req = test::TestRequest::get().uri("/api/v1/properties/all").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["count"], 3);
    let slugs: Vec<&str> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["slug"].as_str().unwrap())
        .collect();
    assert_eq!(
        slugs,
        vec![
            third["slug"].as_str().unwrap(),
            second["slug"].as_str().unwrap(),
            first["slug"].as_str().unwrap(),
        ]
    );
}

#[actix_web::test]
async fn test_list_filters_and_pagination() {
    let app = test::init_service(build_app(Arc::new(MemoryStore::new()))).await;
    let owner = Uuid::new_v4();

    create!(app, owner, listing("Cheap", "Nairobi", 50_000));
    create!(app, owner, listing("Middle", "Mombasa", 100_000));
    create!(app, owner, listing("Pricey", "Nairobi", 300_000));

    let req = test::TestRequest::get()
        .uri("/api/v1/properties/all?search=nairobi&price__gt=60000")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["title"], "Pricey");

    let req = test::TestRequest::get()
        .uri("/api/v1/properties/all?ordering=created_at&page=2&page_size=2")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], 3);
    assert_eq!(body["page"], 2);
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
    assert_eq!(body["results"][0]["title"], "Pricey");

    let req = test::TestRequest::get()
        .uri("/api/v1/properties/all?price__lt=abc")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_agent_listing_only_returns_callers_properties() {
    let app = test::init_service(build_app(Arc::new(MemoryStore::new()))).await;
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    create!(app, alice, listing("Alice's", "Nairobi", 50_000));
    create!(app, bob, listing("Bob's", "Nairobi", 50_000));

    let req = test::TestRequest::get()
        .uri("/api/v1/properties/agents")
        .insert_header(bearer(alice))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["title"], "Alice's");

    let req = test::TestRequest::get().uri("/api/v1/properties/agents").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_views_counted_once_per_address() {
    let app = test::init_service(build_app(Arc::new(MemoryStore::new()))).await;
    let created = create!(app, Uuid::new_v4(), listing("Garden House", "Nairobi", 100_000));
    let uri = format!("/api/v1/properties/details/{}", created["slug"].as_str().unwrap());

    for forwarded in ["203.0.113.7", "203.0.113.7, 10.0.0.1"] {
        let req = test::TestRequest::get()
            .uri(&uri)
            .insert_header(("X-Forwarded-For", forwarded))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["views"], 1);
    }

    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(("X-Forwarded-For", "198.51.100.2"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["views"], 2);

    let req = test::TestRequest::get().uri("/api/v1/properties/views").to_request();
    let views: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(views.as_array().unwrap().len(), 2);
    assert_eq!(views[0]["ip"], "198.51.100.2");
}

#[actix_web::test]
async fn test_detail_of_unknown_slug_is_not_found() {
    let app = test::init_service(build_app(Arc::new(MemoryStore::new()))).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/properties/details/no-such-home")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_only_owner_can_update_or_delete() {
    let app = test::init_service(build_app(Arc::new(MemoryStore::new()))).await;
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let created = create!(app, owner, listing("Garden House", "Nairobi", 100_000));
    let slug = created["slug"].as_str().unwrap();

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/properties/update/{}", slug))
        .insert_header(bearer(stranger))
        .set_json(listing("Hijacked", "Nairobi", 1))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/properties/delete/{}", slug))
        .insert_header(bearer(stranger))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/properties/update/{}", slug))
        .insert_header(bearer(owner))
        .set_json(listing("Garden House", "Nakuru", 95_000))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["city"], "Nakuru");

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/properties/delete/{}", slug))
        .insert_header(bearer(owner))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], "Property deleted successfully");

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/properties/delete/{}", slug))
        .insert_header(bearer(owner))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_upload_image_references() {
    let app = test::init_service(build_app(Arc::new(MemoryStore::new()))).await;
    let owner = Uuid::new_v4();
    let created = create!(app, owner, listing("Garden House", "Nairobi", 100_000));

    let body = json!({
        "property_id": created["id"],
        "cover_photo": "images/garden-cover.jpg",
        "photo1": "images/garden-kitchen.jpg"
    });

    let req = test::TestRequest::post()
        .uri("/api/v1/properties/upload-image")
        .insert_header(bearer(Uuid::new_v4()))
        .set_json(&body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/api/v1/properties/upload-image")
        .insert_header(bearer(owner))
        .set_json(&body)
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["message"], "Image uploaded");

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/properties/details/{}", created["slug"].as_str().unwrap()))
        .to_request();
    let detail: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(detail["cover_photo"], "images/garden-cover.jpg");
    assert_eq!(detail["photo1"], "images/garden-kitchen.jpg");
    assert!(detail["photo2"].is_null());
}

#[actix_web::test]
async fn test_search_requires_authentication() {
    let app = test::init_service(build_app(Arc::new(MemoryStore::new()))).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/properties/search")
        .set_json(search_body("Any"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_search_price_band() {
    let app = test::init_service(build_app(Arc::new(MemoryStore::new()))).await;
    let owner = Uuid::new_v4();

    create!(app, owner, listing("Affordable", "Nairobi", 80_000));
    create!(app, owner, listing("Spacious", "Nairobi", 120_000));

    let req = test::TestRequest::post()
        .uri("/api/v1/properties/search")
        .insert_header(bearer(owner))
        .set_json(search_body("$100,000+"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Spacious"]);

    let req = test::TestRequest::post()
        .uri("/api/v1/properties/search")
        .insert_header(bearer(owner))
        .set_json(search_body("Any"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn test_search_excludes_unpublished_and_rejects_unknown_labels() {
    let app = test::init_service(build_app(Arc::new(MemoryStore::new()))).await;
    let owner = Uuid::new_v4();

    let mut draft = listing("Draft", "Nairobi", 150_000);
    draft["published_status"] = json!(false);
    create!(app, owner, draft);

    let req = test::TestRequest::post()
        .uri("/api/v1/properties/search")
        .insert_header(bearer(owner))
        .set_json(search_body("Any"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body.as_array().unwrap().is_empty());

    let req = test::TestRequest::post()
        .uri("/api/v1/properties/search")
        .insert_header(bearer(owner))
        .set_json(search_body("$75,000+"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["details"]["price"].is_array());
}

fn agent() -> AgentProfile {
    AgentProfile {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        is_agent: true,
        num_reviews: 0,
        rating: None,
    }
}

fn rate(agent_id: Uuid, rater: Uuid, rating: i16) -> test::TestRequest {
    test::TestRequest::post()
        .uri(&format!("/api/v1/ratings/{}", agent_id))
        .insert_header(bearer(rater))
        .set_json(json!({ "rating": rating, "comment": "Helpful and quick" }))
}

#[actix_web::test]
async fn test_ratings_aggregate_and_reject_duplicates() {
    let store = Arc::new(MemoryStore::new());
    let agent = agent();
    store.insert_profile(agent.clone()).await;
    let app = test::init_service(build_app(store.clone())).await;

    let first = Uuid::new_v4();
    let resp = test::call_service(&app, rate(agent.id, first, 3).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = test::call_service(&app, rate(agent.id, Uuid::new_v4(), 5).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["num_reviews"], 2);
    assert_eq!(body["rating"], 4.0);

    let resp = test::call_service(&app, rate(agent.id, first, 1).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let profile = store.profile(agent.id).await.unwrap();
    assert_eq!(profile.num_reviews, 2);
    assert_eq!(profile.rating, Some(4.0));
}

#[actix_web::test]
async fn test_self_rating_rejected_for_any_value() {
    let store = Arc::new(MemoryStore::new());
    let agent = agent();
    store.insert_profile(agent.clone()).await;
    let app = test::init_service(build_app(store.clone())).await;

    for value in [0, 3, 5, 9] {
        let resp = test::call_service(&app, rate(agent.id, agent.user_id, value).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "self_rating");
    }

    assert_eq!(store.profile(agent.id).await.unwrap().num_reviews, 0);
}

#[actix_web::test]
async fn test_rating_errors() {
    let store = Arc::new(MemoryStore::new());
    let agent = agent();
    store.insert_profile(agent.clone()).await;
    let app = test::init_service(build_app(store)).await;

    let resp = test::call_service(&app, rate(agent.id, Uuid::new_v4(), 6).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(&app, rate(Uuid::new_v4(), Uuid::new_v4(), 4).to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri("/api/v1/ratings/not-a-uuid")
        .insert_header(bearer(Uuid::new_v4()))
        .set_json(json!({ "rating": 4 }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}
