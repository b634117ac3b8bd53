pub use super::enriched_sales::Entity as EnrichedSales;
pub use super::marketplace_accounts::Entity as MarketplaceAccounts;
pub use super::sync_runs::Entity as SyncRuns;
