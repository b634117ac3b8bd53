//! Domain types for the sales enrichment pipeline.
//!
//! `OrderSummary` is the minimal shape returned by the order-search endpoint;
//! `EnrichedSale` is the denormalized record one enrichment pass produces.
//! Section structs are independently nullable slices of the final record,
//! each populated by exactly one enricher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Minimal order record from the order-search call. Read-only input to
/// enrichment; never persisted by this subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: String,
    pub status: Option<String>,
    pub date_created: Option<DateTime<Utc>>,
    pub buyer_id: Option<String>,
    pub seller_id: Option<String>,
    pub payment_ids: Vec<String>,
    pub shipping_id: Option<String>,
    pub pack_id: Option<String>,
    pub line_items: Vec<OrderLineItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub item_id: Option<String>,
    pub title: Option<String>,
    pub quantity: Option<i32>,
    pub unit_price: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderSection {
    pub status: Option<String>,
    pub status_detail: Option<String>,
    pub date_created: Option<DateTime<Utc>>,
    pub date_closed: Option<DateTime<Utc>>,
    pub total_amount: Option<f64>,
    pub paid_amount: Option<f64>,
    pub currency: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemSection {
    pub item_id: Option<String>,
    pub title: Option<String>,
    pub category_id: Option<String>,
    pub quantity: Option<i32>,
    pub unit_price: Option<f64>,
    pub sku: Option<String>,
    pub condition: Option<String>,
    pub catalog_product_id: Option<String>,
    pub catalog_product_name: Option<String>,
    pub brand: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentSection {
    pub payment_id: Option<String>,
    pub status: Option<String>,
    pub payment_type: Option<String>,
    pub payment_method: Option<String>,
    pub transaction_amount: Option<f64>,
    pub net_received_amount: Option<f64>,
    pub taxes_amount: Option<f64>,
    pub shipping_cost: Option<f64>,
    pub installments: Option<i32>,
    pub date_approved: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShippingSection {
    pub shipment_id: Option<String>,
    pub status: Option<String>,
    pub substatus: Option<String>,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub shipping_method: Option<String>,
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub date_shipped: Option<DateTime<Utc>>,
    pub date_delivered: Option<DateTime<Utc>>,
    pub cost: Option<f64>,
}

/// Claim plus whichever outcome it resolved into. `resolution` is either
/// "return" or "change" when the dependent lookup succeeded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClaimSection {
    pub claim_id: Option<String>,
    pub claim_type: Option<String>,
    pub claim_status: Option<String>,
    pub claim_stage: Option<String>,
    pub reason: Option<String>,
    pub date_created: Option<DateTime<Utc>>,
    pub resolution: Option<String>,
    pub return_id: Option<String>,
    pub return_status: Option<String>,
    pub return_tracking_number: Option<String>,
    pub change_id: Option<String>,
    pub change_status: Option<String>,
}

/// Buyer and seller identity, fetched from the users endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactsSection {
    pub buyer_nickname: Option<String>,
    pub buyer_name: Option<String>,
    pub buyer_email: Option<String>,
    pub buyer_phone: Option<String>,
    pub seller_nickname: Option<String>,
    pub seller_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackSection {
    pub buyer_rating: Option<String>,
    pub buyer_comment: Option<String>,
    pub buyer_fulfilled: Option<bool>,
    pub seller_rating: Option<String>,
    pub seller_comment: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagesSection {
    pub message_count: Option<i32>,
    pub last_message_date: Option<DateTime<Utc>>,
    pub last_message_from: Option<String>,
}

/// One entry per section whose upstream call(s) failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncError {
    pub step: String,
    pub error: String,
}

/// Verbatim upstream payload snapshots, one slot per section. Retained for
/// forward-compatibility and debugging; never read by the pipeline itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPayloads {
    pub order: Option<Value>,
    pub item: Option<Value>,
    pub payment: Option<Value>,
    pub shipping: Option<Value>,
    pub claim: Option<Value>,
    pub contacts: Option<Value>,
    pub feedback: Option<Value>,
    pub messages: Option<Value>,
}

/// The aggregate this pipeline produces: one instance per marketplace order,
/// rebuilt from scratch on every enrichment pass and upserted wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedSale {
    pub order_id: String,
    pub account_ref: String,
    pub seller_id: String,
    pub order: Option<OrderSection>,
    pub item: Option<ItemSection>,
    pub payment: Option<PaymentSection>,
    pub shipping: Option<ShippingSection>,
    pub claim: Option<ClaimSection>,
    pub contacts: Option<ContactsSection>,
    pub feedback: Option<FeedbackSection>,
    pub messages: Option<MessagesSection>,
    pub raw: RawPayloads,
    pub completeness_score: i32,
    pub sync_errors: Vec<SyncError>,
    pub endpoints_accessed: Vec<String>,
    pub sync_duration_ms: i64,
    pub last_sync: DateTime<Utc>,
}

impl EnrichedSale {
    /// Seed a fresh record from the fields the search result already carries.
    /// No network call is needed for these.
    pub fn from_summary(summary: &OrderSummary, account_ref: &str, seller_id: &str) -> Self {
        Self {
            order_id: summary.id.clone(),
            account_ref: account_ref.to_string(),
            seller_id: seller_id.to_string(),
            order: Some(OrderSection {
                status: summary.status.clone(),
                date_created: summary.date_created,
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
            completeness_score: 0,
            sync_errors: Vec::new(),
            endpoints_accessed: Vec::new(),
            sync_duration_ms: 0,
            last_sync: Utc::now(),
        }
    }
}
