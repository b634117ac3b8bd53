// src/lib.rs

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use services::credentials::StoredCredentials;
use services::marketplace::MarketplaceClient;
use services::sales_sync::SyncConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub marketplace: Arc<MarketplaceClient>,
    pub credentials: Arc<StoredCredentials>,
    pub sync_config: SyncConfig,
}

pub mod entities {
    pub mod prelude;
    pub mod enriched_sales;
    pub mod marketplace_accounts;
    pub mod sync_runs;
}

pub mod services {
    pub mod completeness;
    pub mod credentials;
    pub mod marketplace;
    pub mod sale_enrichment;
    pub mod sales_store;
    pub mod sales_sync;
    pub mod sections;
}

pub mod models;
pub mod handlers;
pub mod jobs;
