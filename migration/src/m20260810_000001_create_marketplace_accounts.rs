use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MarketplaceAccounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MarketplaceAccounts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MarketplaceAccounts::AccountRef)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(MarketplaceAccounts::SellerId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketplaceAccounts::AccessToken)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketplaceAccounts::TokenExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(MarketplaceAccounts::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(MarketplaceAccounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .col(
                        ColumnDef::new(MarketplaceAccounts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MarketplaceAccounts::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum MarketplaceAccounts {
    Table,
    Id,
    AccountRef,
    SellerId,
    AccessToken,
    TokenExpiresAt,
    Active,
    CreatedAt,
    UpdatedAt,
}
