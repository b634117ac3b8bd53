//! Persistence gateway for enriched sales.
//!
//! One bulk upsert keyed by `order_id`. An existing row is overwritten in
//! full (last-write-wins); there is no field-level merge with prior state.

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use serde::Serialize;

use crate::entities::{enriched_sales, prelude::*};
use crate::models::sale::EnrichedSale;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("bulk upsert failed: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("failed to serialize record {order_id}: {source}")]
    Serialize {
        order_id: String,
        #[source]
        source: serde_json::Error,
    },
}

#[async_trait]
pub trait SaleStore: Send + Sync {
    async fn upsert_sales(&self, sales: &[EnrichedSale]) -> Result<(), StoreError>;
}

pub struct SeaOrmSaleStore {
    db: DatabaseConnection,
}

impl SeaOrmSaleStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SaleStore for SeaOrmSaleStore {
    async fn upsert_sales(&self, sales: &[EnrichedSale]) -> Result<(), StoreError> {
        if sales.is_empty() {
            return Ok(());
        }

        let models = sales
            .iter()
            .map(to_active_model)
            .collect::<Result<Vec<_>, _>>()?;

        use enriched_sales::Column;
        EnrichedSales::insert_many(models)
            .on_conflict(
                OnConflict::column(Column::OrderId)
                    .update_columns([
                        Column::AccountRef,
                        Column::SellerId,
                        Column::OrderData,
                        Column::ItemData,
                        Column::PaymentData,
                        Column::ShippingData,
                        Column::ClaimData,
                        Column::ContactsData,
                        Column::FeedbackData,
                        Column::MessagesData,
                        Column::RawOrder,
                        Column::RawItem,
                        Column::RawPayment,
                        Column::RawShipping,
                        Column::RawClaim,
                        Column::RawContacts,
                        Column::RawFeedback,
                        Column::RawMessages,
                        Column::CompletenessScore,
                        Column::SyncErrors,
                        Column::EndpointsAccessed,
                        Column::SyncDurationMs,
                        Column::LastSync,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;

        tracing::info!(count = sales.len(), "Upserted enriched sales");

        Ok(())
    }
}

fn opt_json<T: Serialize>(
    order_id: &str,
    value: &Option<T>,
) -> Result<Option<serde_json::Value>, StoreError> {
    value
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(|source| StoreError::Serialize {
            order_id: order_id.to_string(),
            source,
        })
}

fn json<T: Serialize>(order_id: &str, value: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value).map_err(|source| StoreError::Serialize {
        order_id: order_id.to_string(),
        source,
    })
}

fn to_active_model(sale: &EnrichedSale) -> Result<enriched_sales::ActiveModel, StoreError> {
    let id = &sale.order_id;
    Ok(enriched_sales::ActiveModel {
        order_id: Set(sale.order_id.clone()),
        account_ref: Set(sale.account_ref.clone()),
        seller_id: Set(sale.seller_id.clone()),
        order_data: Set(opt_json(id, &sale.order)?),
        item_data: Set(opt_json(id, &sale.item)?),
        payment_data: Set(opt_json(id, &sale.payment)?),
        shipping_data: Set(opt_json(id, &sale.shipping)?),
        claim_data: Set(opt_json(id, &sale.claim)?),
        contacts_data: Set(opt_json(id, &sale.contacts)?),
        feedback_data: Set(opt_json(id, &sale.feedback)?),
        messages_data: Set(opt_json(id, &sale.messages)?),
        raw_order: Set(sale.raw.order.clone()),
        raw_item: Set(sale.raw.item.clone()),
        raw_payment: Set(sale.raw.payment.clone()),
        raw_shipping: Set(sale.raw.shipping.clone()),
        raw_claim: Set(sale.raw.claim.clone()),
        raw_contacts: Set(sale.raw.contacts.clone()),
        raw_feedback: Set(sale.raw.feedback.clone()),
        raw_messages: Set(sale.raw.messages.clone()),
        completeness_score: Set(sale.completeness_score),
        sync_errors: Set(json(id, &sale.sync_errors)?),
        endpoints_accessed: Set(json(id, &sale.endpoints_accessed)?),
        sync_duration_ms: Set(sale.sync_duration_ms),
        last_sync: Set(sale.last_sync.fixed_offset()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sale::{OrderSection, RawPayloads, SyncError};
    use chrono::Utc;

    fn sample_sale() -> EnrichedSale {
        EnrichedSale {
            order_id: "2000001".to_string(),
            account_ref: "acct-1".to_string(),
            seller_id: "22".to_string(),
            order: Some(OrderSection {
                status: Some("paid".to_string()),
                ..Default::default()
            }),
            item: None,
            payment: None,
            shipping: None,
            claim: None,
            contacts: None,
            feedback: None,
            messages: None,
            raw: RawPayloads::default(),
            completeness_score: 8,
            sync_errors: vec![SyncError {
                step: "payment".to_string(),
                error: "HTTP 500".to_string(),
            }],
            endpoints_accessed: vec!["orders/:id".to_string()],
            sync_duration_ms: 12,
            last_sync: Utc::now(),
        }
    }

    #[test]
    fn test_to_active_model_maps_sections() {
        let model = to_active_model(&sample_sale()).unwrap();

        assert_eq!(model.order_id.clone().unwrap(), "2000001");
        assert!(model.order_data.as_ref().is_some());
        assert!(model.payment_data.as_ref().is_none());
        assert_eq!(model.completeness_score.as_ref(), &8);

        let errors = model.sync_errors.as_ref();
        assert_eq!(errors[0]["step"], "payment");
    }
}
