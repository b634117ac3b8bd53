use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncRuns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SyncRuns::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SyncRuns::AccountRef).string().not_null())
                    .col(
                        ColumnDef::new(SyncRuns::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SyncRuns::FinishedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SyncRuns::Success).boolean().not_null())
                    .col(
                        ColumnDef::new(SyncRuns::OrderCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncRuns::DurationMs)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncRuns::EndpointsAccessed)
                            .json_binary()
                            .null(),
                    )
                    .col(ColumnDef::new(SyncRuns::Error).text().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sync_runs_account_ref")
                    .table(SyncRuns::Table)
                    .col(SyncRuns::AccountRef)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SyncRuns::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum SyncRuns {
    Table,
    Id,
    AccountRef,
    StartedAt,
    FinishedAt,
    Success,
    OrderCount,
    DurationMs,
    EndpointsAccessed,
    Error,
}
