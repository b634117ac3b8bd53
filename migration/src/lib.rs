pub use sea_orm_migration::prelude::*;

mod m20260810_000001_create_marketplace_accounts;
mod m20260810_000002_create_enriched_sales;
mod m20260810_000003_create_sync_runs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260810_000001_create_marketplace_accounts::Migration),
            Box::new(m20260810_000002_create_enriched_sales::Migration),
            Box::new(m20260810_000003_create_sync_runs::Migration),
        ]
    }
}
