use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EnrichedSales::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EnrichedSales::OrderId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(EnrichedSales::AccountRef)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnrichedSales::SellerId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(EnrichedSales::OrderData).json_binary().null())
                    .col(ColumnDef::new(EnrichedSales::ItemData).json_binary().null())
                    .col(ColumnDef::new(EnrichedSales::PaymentData).json_binary().null())
                    .col(ColumnDef::new(EnrichedSales::ShippingData).json_binary().null())
                    .col(ColumnDef::new(EnrichedSales::ClaimData).json_binary().null())
                    .col(ColumnDef::new(EnrichedSales::ContactsData).json_binary().null())
                    .col(ColumnDef::new(EnrichedSales::FeedbackData).json_binary().null())
                    .col(ColumnDef::new(EnrichedSales::MessagesData).json_binary().null())
                    .col(ColumnDef::new(EnrichedSales::RawOrder).json_binary().null())
                    .col(ColumnDef::new(EnrichedSales::RawItem).json_binary().null())
                    .col(ColumnDef::new(EnrichedSales::RawPayment).json_binary().null())
                    .col(ColumnDef::new(EnrichedSales::RawShipping).json_binary().null())
                    .col(ColumnDef::new(EnrichedSales::RawClaim).json_binary().null())
                    .col(ColumnDef::new(EnrichedSales::RawContacts).json_binary().null())
                    .col(ColumnDef::new(EnrichedSales::RawFeedback).json_binary().null())
                    .col(ColumnDef::new(EnrichedSales::RawMessages).json_binary().null())
                    .col(
                        ColumnDef::new(EnrichedSales::CompletenessScore)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(EnrichedSales::SyncErrors)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnrichedSales::EndpointsAccessed)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnrichedSales::SyncDurationMs)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(EnrichedSales::LastSync)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_enriched_sales_account_ref")
                    .table(EnrichedSales::Table)
                    .col(EnrichedSales::AccountRef)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EnrichedSales::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum EnrichedSales {
    Table,
    OrderId,
    AccountRef,
    SellerId,
    OrderData,
    ItemData,
    PaymentData,
    ShippingData,
    ClaimData,
    ContactsData,
    FeedbackData,
    MessagesData,
    RawOrder,
    RawItem,
    RawPayment,
    RawShipping,
    RawClaim,
    RawContacts,
    RawFeedback,
    RawMessages,
    CompletenessScore,
    SyncErrors,
    EndpointsAccessed,
    SyncDurationMs,
    LastSync,
}
