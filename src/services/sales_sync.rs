//! Batch orchestration.
//!
//! One batch resolves the account credential, runs a single order search,
//! enriches each returned order, and persists all produced records in one
//! bulk upsert. Credential, search, and upsert failures are fatal for the
//! batch; anything that goes wrong inside a single order's enrichment is
//! logged and that order is skipped.

use futures_util::StreamExt;
use futures_util::stream;
use std::collections::BTreeSet;
use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::models::sale::{EnrichedSale, OrderSummary};
use crate::services::credentials::{CredentialError, CredentialSource};
use crate::services::marketplace::{
    EndpointSet, MarketplaceApi, OrderSearchQuery, UpstreamError,
};
use crate::services::sale_enrichment;
use crate::services::sales_store::{SaleStore, StoreError};

/// Tunables for the sync pipeline, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// How many orders are enriched at the same time. 1 keeps the original
    /// sequential-across-orders behavior, which bounds upstream rate-limit
    /// exposure. Within one order the eight sections always run concurrently.
    pub order_concurrency: usize,
    pub request_timeout_secs: u64,
    /// Extra attempts for transport errors and 5xx responses. 0 means every
    /// upstream call is a single attempt.
    pub retry_attempts: u32,
    pub sync_interval_secs: u64,
    pub batch_limit: u32,
    /// Wall-clock bound for one whole batch, on top of the per-request
    /// timeout. 0 disables the bound.
    pub batch_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            order_concurrency: 1,
            request_timeout_secs: 30,
            retry_attempts: 0,
            sync_interval_secs: 3600,
            batch_limit: 50,
            batch_timeout_secs: 600,
        }
    }
}

impl SyncConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            order_concurrency: env_parse("SYNC_ORDER_CONCURRENCY", defaults.order_concurrency),
            request_timeout_secs: env_parse(
                "SYNC_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            ),
            retry_attempts: env_parse("SYNC_RETRY_ATTEMPTS", defaults.retry_attempts),
            sync_interval_secs: env_parse("SYNC_INTERVAL_SECS", defaults.sync_interval_secs),
            batch_limit: env_parse("SYNC_BATCH_LIMIT", defaults.batch_limit),
            batch_timeout_secs: env_parse("SYNC_BATCH_TIMEOUT_SECS", defaults.batch_timeout_secs),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Caller-supplied bounds for one batch.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub date_from: Option<chrono::DateTime<chrono::Utc>>,
    pub date_to: Option<chrono::DateTime<chrono::Utc>>,
    pub limit: Option<u32>,
}

#[derive(Debug)]
pub struct BatchResult {
    pub count: usize,
    pub duration_ms: i64,
    pub endpoints_accessed: Vec<String>,
    pub records: Vec<EnrichedSale>,
}

/// Fatal batch failures. Per-section and per-order failures never surface
/// here; they live in each record's `sync_errors` or in the logs.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("credential resolution failed: {0}")]
    Credential(#[from] CredentialError),
    #[error("order search failed: {0}")]
    Search(#[from] UpstreamError),
    #[error("persisting enriched sales failed: {0}")]
    Store(#[from] StoreError),
    #[error("batch deadline of {0}s exceeded")]
    Timeout(u64),
}

pub async fn run_batch(
    api: Arc<dyn MarketplaceApi>,
    store: &dyn SaleStore,
    credentials: &dyn CredentialSource,
    account_ref: &str,
    options: &BatchOptions,
    config: &SyncConfig,
) -> Result<BatchResult, BatchError> {
    let inner = run_batch_inner(api, store, credentials, account_ref, options, config);

    if config.batch_timeout_secs == 0 {
        return inner.await;
    }

    match tokio::time::timeout(Duration::from_secs(config.batch_timeout_secs), inner).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(
                account = account_ref,
                timeout_secs = config.batch_timeout_secs,
                "Batch deadline exceeded, aborting"
            );
            Err(BatchError::Timeout(config.batch_timeout_secs))
        }
    }
}

async fn run_batch_inner(
    api: Arc<dyn MarketplaceApi>,
    store: &dyn SaleStore,
    credentials: &dyn CredentialSource,
    account_ref: &str,
    options: &BatchOptions,
    config: &SyncConfig,
) -> Result<BatchResult, BatchError> {
    let started = Instant::now();

    tracing::info!(account = account_ref, "Starting sales enrichment batch");

    let credential = credentials.resolve(account_ref).await?;

    let batch_endpoints = EndpointSet::new();
    let query = OrderSearchQuery {
        date_from: options.date_from,
        date_to: options.date_to,
        limit: options.limit.unwrap_or(config.batch_limit),
    };
    let search = api
        .search_orders(&credential, &query, &batch_endpoints)
        .await?;

    let summaries: Vec<OrderSummary> = search
        .data
        .results
        .into_iter()
        .map(|payload| payload.into_summary())
        .collect();

    if summaries.is_empty() {
        tracing::info!(account = account_ref, "Order search returned no orders");
        return Ok(BatchResult {
            count: 0,
            duration_ms: started.elapsed().as_millis() as i64,
            endpoints_accessed: batch_endpoints.sorted(),
            records: Vec::new(),
        });
    }

    tracing::info!(
        account = account_ref,
        orders = summaries.len(),
        concurrency = config.order_concurrency,
        "Enriching orders"
    );

    let credential = Arc::new(credential);
    let account = account_ref.to_string();

    // Each order runs inside its own spawned task so a panic in one order's
    // enrichment is caught at the join and only that order is dropped.
    let records: Vec<EnrichedSale> = stream::iter(summaries.into_iter().map(|summary| {
        let api = Arc::clone(&api);
        let credential = Arc::clone(&credential);
        let account = account.clone();
        async move {
            let order_id = summary.id.clone();
            let handle = tokio::spawn(async move {
                sale_enrichment::enrich_sale(api.as_ref(), &summary, &credential, &account).await
            });
            match handle.await {
                Ok(sale) => Some(sale),
                Err(err) => {
                    tracing::error!(
                        order_id = %order_id,
                        error = %err,
                        "Order enrichment aborted, skipping"
                    );
                    None
                }
            }
        }
    }))
    .buffered(config.order_concurrency.max(1))
    .collect::<Vec<_>>()
    .await
    .into_iter()
    .flatten()
    .collect();

    let mut endpoint_union: BTreeSet<String> = batch_endpoints.sorted().into_iter().collect();
    for record in &records {
        endpoint_union.extend(record.endpoints_accessed.iter().cloned());
    }

    store.upsert_sales(&records).await?;

    let result = BatchResult {
        count: records.len(),
        duration_ms: started.elapsed().as_millis() as i64,
        endpoints_accessed: endpoint_union.into_iter().collect(),
        records,
    };

    tracing::info!(
        account = account_ref,
        count = result.count,
        duration_ms = result.duration_ms,
        endpoints = result.endpoints_accessed.len(),
        "Sales enrichment batch finished"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_single_attempt_sequential() {
        let config = SyncConfig::default();
        assert_eq!(config.order_concurrency, 1);
        assert_eq!(config.retry_attempts, 0);
        assert_eq!(config.batch_timeout_secs, 600);
    }

    #[test]
    fn test_env_parse_falls_back_on_garbage() {
        // Variable is unset in the test environment.
        assert_eq!(env_parse("SYNC_DOES_NOT_EXIST", 7u32), 7);
    }
}
