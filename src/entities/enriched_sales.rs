//! SeaORM Entity for enriched_sales table
//!
//! One row per marketplace order, rewritten wholesale on every sync pass.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "enriched_sales")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub order_id: String,
    pub account_ref: String,
    pub seller_id: String,
    pub order_data: Option<Json>,
    pub item_data: Option<Json>,
    pub payment_data: Option<Json>,
    pub shipping_data: Option<Json>,
    pub claim_data: Option<Json>,
    pub contacts_data: Option<Json>,
    pub feedback_data: Option<Json>,
    pub messages_data: Option<Json>,
    pub raw_order: Option<Json>,
    pub raw_item: Option<Json>,
    pub raw_payment: Option<Json>,
    pub raw_shipping: Option<Json>,
    pub raw_claim: Option<Json>,
    pub raw_contacts: Option<Json>,
    pub raw_feedback: Option<Json>,
    pub raw_messages: Option<Json>,
    pub completeness_score: i32,
    pub sync_errors: Json,
    pub endpoints_accessed: Json,
    pub sync_duration_ms: i64,
    pub last_sync: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
