//! API request/response shapes for the sales endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::enriched_sales;

#[derive(Debug, Clone, Deserialize)]
pub struct SyncRequest {
    pub account_ref: String,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncResponse {
    pub success: bool,
    pub count: usize,
    pub duration_ms: i64,
    pub endpoints_accessed: Vec<String>,
    pub order_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SalesQuery {
    pub account_ref: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesListResponse {
    pub sales: Vec<enriched_sales::Model>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
