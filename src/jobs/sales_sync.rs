//! Periodic sales enrichment job.
//!
//! Runs one batch per active account at a fixed interval, starting
//! immediately on boot. Every run, successful or not, leaves a row in
//! sync_runs.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use tokio::time::{Duration, interval};

use crate::entities::{marketplace_accounts, prelude::*, sync_runs};
use crate::services::credentials::CredentialSource;
use crate::services::marketplace::MarketplaceApi;
use crate::services::sales_store::SeaOrmSaleStore;
use crate::services::sales_sync::{self, BatchError, BatchOptions, BatchResult, SyncConfig};

pub async fn start_sales_sync_job(
    db: DatabaseConnection,
    api: Arc<dyn MarketplaceApi>,
    credentials: Arc<dyn CredentialSource>,
    config: SyncConfig,
) {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(config.sync_interval_secs));

        loop {
            // First tick fires immediately, so the initial sync runs on boot.
            ticker.tick().await;
            tracing::info!("Starting scheduled sales enrichment sync");

            if let Err(e) =
                sync_all_accounts(&db, Arc::clone(&api), credentials.as_ref(), &config).await
            {
                tracing::error!("Sales enrichment sync failed: {}", e);
            }
        }
    });
}

async fn sync_all_accounts(
    db: &DatabaseConnection,
    api: Arc<dyn MarketplaceApi>,
    credentials: &dyn CredentialSource,
    config: &SyncConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let accounts = MarketplaceAccounts::find()
        .filter(marketplace_accounts::Column::Active.eq(true))
        .all(db)
        .await?;

    if accounts.is_empty() {
        tracing::info!("No active marketplace accounts to sync");
        return Ok(());
    }

    tracing::info!(accounts = accounts.len(), "Syncing marketplace accounts");

    let store = SeaOrmSaleStore::new(db.clone());

    for account in accounts {
        let started_at = Utc::now();
        let outcome = sales_sync::run_batch(
            Arc::clone(&api),
            &store,
            credentials,
            &account.account_ref,
            &BatchOptions::default(),
            config,
        )
        .await;

        match &outcome {
            Ok(result) => {
                tracing::info!(
                    account = %account.account_ref,
                    count = result.count,
                    "Account sync complete"
                );
            }
            Err(e) => {
                tracing::error!(
                    account = %account.account_ref,
                    error = %e,
                    "Account sync failed"
                );
            }
        }

        record_sync_run(db, &account.account_ref, started_at, &outcome).await;
    }

    Ok(())
}

async fn record_sync_run(
    db: &DatabaseConnection,
    account_ref: &str,
    started_at: chrono::DateTime<Utc>,
    outcome: &Result<BatchResult, BatchError>,
) {
    let finished_at = Utc::now();
    let run = match outcome {
        Ok(result) => sync_runs::ActiveModel {
            account_ref: Set(account_ref.to_string()),
            started_at: Set(started_at.fixed_offset()),
            finished_at: Set(finished_at.fixed_offset()),
            success: Set(true),
            order_count: Set(result.count as i32),
            duration_ms: Set(result.duration_ms),
            endpoints_accessed: Set(serde_json::to_value(&result.endpoints_accessed).ok()),
            error: Set(None),
            ..Default::default()
        },
        Err(e) => sync_runs::ActiveModel {
            account_ref: Set(account_ref.to_string()),
            started_at: Set(started_at.fixed_offset()),
            finished_at: Set(finished_at.fixed_offset()),
            success: Set(false),
            order_count: Set(0),
            duration_ms: Set((finished_at - started_at).num_milliseconds()),
            endpoints_accessed: Set(None),
            error: Set(Some(e.to_string())),
            ..Default::default()
        },
    };

    if let Err(e) = run.insert(db).await {
        tracing::error!(account = account_ref, "Failed to record sync run: {}", e);
    }
}
