use axum::{
    Router,
    routing::{get, post},
};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use std::env;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use saleshub_backend::AppState;
use saleshub_backend::handlers;
use saleshub_backend::jobs;
use saleshub_backend::services::credentials::{CredentialSource, StoredCredentials};
use saleshub_backend::services::marketplace::{MarketplaceApi, MarketplaceClient};
use saleshub_backend::services::sales_sync::SyncConfig;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,saleshub_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Connect to database
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    tracing::info!("Connecting to database...");
    let db = Database::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let sync_config = SyncConfig::from_env();
    let base_url = env::var("MARKETPLACE_API_BASE")
        .unwrap_or_else(|_| "https://api.mercadolibre.com".to_string());

    let marketplace = Arc::new(MarketplaceClient::new(
        base_url,
        sync_config.request_timeout_secs,
        sync_config.retry_attempts,
    ));
    let credentials = Arc::new(StoredCredentials::new(db.clone()));

    // Background enrichment job
    jobs::sales_sync::start_sales_sync_job(
        db.clone(),
        Arc::clone(&marketplace) as Arc<dyn MarketplaceApi>,
        Arc::clone(&credentials) as Arc<dyn CredentialSource>,
        sync_config.clone(),
    )
    .await;

    let state = AppState {
        db,
        marketplace,
        credentials,
        sync_config,
    };

    // Build router
    let app = Router::new()
        .route("/", get(hello_saleshub))
        .route("/api/sales", get(handlers::sales::list_sales))
        .route("/api/sales/sync", post(handlers::sales::trigger_sync))
        .route("/api/sales/{order_id}", get(handlers::sales::get_sale))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000")
        .await
        .unwrap();

    tracing::info!("Server listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}

async fn hello_saleshub() -> &'static str {
    "Hello from SalesHub Backend!"
}
