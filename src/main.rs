use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use realty_listings::config::{Settings, StorageBackend};
use realty_listings::error::{handle_json_payload_error, handle_path_error, handle_query_payload_error};
use realty_listings::routes::{self, AppState};
use realty_listings::services::{ListingService, ListingStore, MemoryStore, PostgresClient};
use realty_listings::JwtVerifier;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn other_error(message: String) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, message)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration before logging so the [logging] section applies
    let loaded = Settings::load();
    let logging = loaded
        .as_ref()
        .map(|settings| settings.logging.clone())
        .unwrap_or_default()
        .with_env_overrides(std::env::var("LOG_LEVEL").ok(), std::env::var("LOG_FORMAT").ok());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level)),
        )
        .with_target(false)
        .with_level(true);

    if logging.is_pretty() {
        subscriber.pretty().init();
    } else {
        subscriber.compact().init();
    }

    info!("Starting realty listings service...");

    let settings = loaded.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        other_error(format!("Configuration error: {}", e))
    })?;

    info!("Configuration loaded successfully");

    let store: Arc<dyn ListingStore> = match settings.storage.backend {
        StorageBackend::Postgres => {
            let postgres = PostgresClient::from_settings(&settings.database)
                .await
                .map_err(|e| {
                    error!("Failed to connect to PostgreSQL: {}", e);
                    other_error(format!("PostgreSQL connection error: {}", e))
                })?;
            info!(
                "PostgreSQL store initialized (max: {} connections)",
                settings.database.max_connections.unwrap_or(10)
            );
            Arc::new(postgres)
        }
        StorageBackend::Memory => {
            warn!("Using the in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let listings = Arc::new(ListingService::new(store, settings.search.label_policy));
    info!("Search label policy: {:?}", settings.search.label_policy);

    let verifier = web::Data::new(JwtVerifier::new(
        &settings.auth.jwt_secret,
        settings.auth.leeway_secs,
    ));

    // Build application state
    let app_state = AppState {
        listings,
        pagination: settings.pagination.clone(),
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(verifier.clone())
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .app_data(web::PathConfig::default().error_handler(handle_path_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
