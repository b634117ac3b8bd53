//! Marketplace REST client.
//!
//! One authenticated GET per call, no caching. Every call records which
//! endpoint it touched into a shared [`EndpointSet`] so a batch can report
//! the distinct upstream endpoints it hit. Response bodies are parsed into
//! explicit structs with optional fields, and the verbatim JSON is kept
//! alongside for the raw per-section snapshots.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use crate::models::sale::{OrderLineItem, OrderSummary};
use crate::services::credentials::Credential;

/// Stable identifiers for the upstream endpoints, used in diagnostics and
/// error messages. Path parameters are elided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Endpoint {
    OrdersSearch,
    OrderDetail,
    PaymentDetail,
    ShipmentDetail,
    ClaimsSearch,
    ReturnDetail,
    ChangeDetail,
    UserDetail,
    ItemDetail,
    CatalogProductDetail,
    OrderFeedback,
    OrderMessages,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::OrdersSearch => "orders/search",
            Endpoint::OrderDetail => "orders/:id",
            Endpoint::PaymentDetail => "payments/:id",
            Endpoint::ShipmentDetail => "shipments/:id",
            Endpoint::ClaimsSearch => "claims/search",
            Endpoint::ReturnDetail => "returns/:id",
            Endpoint::ChangeDetail => "changes/:id",
            Endpoint::UserDetail => "users/:id",
            Endpoint::ItemDetail => "items/:id",
            Endpoint::CatalogProductDetail => "products/:id",
            Endpoint::OrderFeedback => "orders/:id/feedback",
            Endpoint::OrderMessages => "messages/packs/:id",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concurrency-safe set of endpoints touched while building one record.
/// Multiple section enrichers record into the same set simultaneously.
#[derive(Debug, Default)]
pub struct EndpointSet {
    inner: Mutex<BTreeSet<Endpoint>>,
}

impl EndpointSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, endpoint: Endpoint) {
        self.inner.lock().insert(endpoint);
    }

    /// Snapshot as sorted endpoint identifiers.
    pub fn sorted(&self) -> Vec<String> {
        self.inner
            .lock()
            .iter()
            .map(|e| e.as_str().to_string())
            .collect()
    }
}

/// Failure of a single upstream call. Carries the endpoint identifier and,
/// when the server answered at all, the HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: Endpoint,
        status: StatusCode,
        body: String,
    },
    #[error("{endpoint} request failed: {source}")]
    Transport {
        endpoint: Endpoint,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned an unparseable body: {source}")]
    Decode {
        endpoint: Endpoint,
        #[source]
        source: serde_json::Error,
    },
}

impl UpstreamError {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            UpstreamError::Status { endpoint, .. }
            | UpstreamError::Transport { endpoint, .. }
            | UpstreamError::Decode { endpoint, .. } => *endpoint,
        }
    }
}

/// Parsed payload plus the verbatim body it was parsed from.
#[derive(Debug, Clone)]
pub struct Fetched<T> {
    pub data: T,
    pub raw: Value,
}

fn parse<T: serde::de::DeserializeOwned>(
    endpoint: Endpoint,
    raw: Value,
) -> Result<Fetched<T>, UpstreamError> {
    let data = serde_json::from_value(raw.clone())
        .map_err(|source| UpstreamError::Decode { endpoint, source })?;
    Ok(Fetched { data, raw })
}

// ---------------------------------------------------------------------------
// Upstream payload shapes. Every field the pipeline does not copy out stays
// available through the raw snapshot, so these structs only name what the
// section enrichers actually read.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct OrderSearchPayload {
    #[serde(default)]
    pub results: Vec<OrderSummaryPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderSummaryPayload {
    pub id: i64,
    pub status: Option<String>,
    pub date_created: Option<DateTime<Utc>>,
    pub buyer: Option<ActorRef>,
    pub seller: Option<ActorRef>,
    #[serde(default)]
    pub payments: Vec<IdRef>,
    pub shipping: Option<IdRef>,
    pub pack_id: Option<i64>,
    #[serde(default)]
    pub order_items: Vec<OrderItemPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActorRef {
    pub id: Option<i64>,
    pub nickname: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdRef {
    pub id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemPayload {
    pub item: Option<ItemRef>,
    pub quantity: Option<i32>,
    pub unit_price: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemRef {
    pub id: Option<String>,
    pub title: Option<String>,
}

impl OrderSummaryPayload {
    pub fn into_summary(self) -> OrderSummary {
        OrderSummary {
            id: self.id.to_string(),
            status: self.status,
            date_created: self.date_created,
            buyer_id: self.buyer.and_then(|b| b.id).map(|id| id.to_string()),
            seller_id: self.seller.and_then(|s| s.id).map(|id| id.to_string()),
            payment_ids: self
                .payments
                .into_iter()
                .filter_map(|p| p.id)
                .map(|id| id.to_string())
                .collect(),
            shipping_id: self.shipping.and_then(|s| s.id).map(|id| id.to_string()),
            pack_id: self.pack_id.map(|id| id.to_string()),
            line_items: self
                .order_items
                .into_iter()
                .map(|oi| OrderLineItem {
                    item_id: oi.item.as_ref().and_then(|i| i.id.clone()),
                    title: oi.item.and_then(|i| i.title),
                    quantity: oi.quantity,
                    unit_price: oi.unit_price,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderDetailPayload {
    pub status: Option<String>,
    pub status_detail: Option<String>,
    pub date_created: Option<DateTime<Utc>>,
    pub date_closed: Option<DateTime<Utc>>,
    pub total_amount: Option<f64>,
    pub paid_amount: Option<f64>,
    pub currency_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentPayload {
    pub id: Option<i64>,
    pub status: Option<String>,
    pub payment_type: Option<String>,
    pub payment_method_id: Option<String>,
    pub transaction_amount: Option<f64>,
    pub net_received_amount: Option<f64>,
    pub taxes_amount: Option<f64>,
    pub shipping_cost: Option<f64>,
    pub installments: Option<i32>,
    pub date_approved: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShipmentPayload {
    pub id: Option<i64>,
    pub status: Option<String>,
    pub substatus: Option<String>,
    pub tracking_number: Option<String>,
    pub tracking_method: Option<String>,
    pub base_cost: Option<f64>,
    pub shipping_method: Option<NamedRef>,
    pub receiver_address: Option<ReceiverAddressPayload>,
    pub status_history: Option<ShipmentStatusHistory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedRef {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReceiverAddressPayload {
    pub address_line: Option<String>,
    pub zip_code: Option<String>,
    pub city: Option<NamedRef>,
    pub state: Option<NamedRef>,
    pub country: Option<NamedRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShipmentStatusHistory {
    pub date_shipped: Option<DateTime<Utc>>,
    pub date_delivered: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClaimSearchPayload {
    #[serde(default)]
    pub data: Vec<ClaimPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClaimPayload {
    pub id: Option<i64>,
    #[serde(rename = "type")]
    pub claim_type: Option<String>,
    pub status: Option<String>,
    pub stage: Option<String>,
    pub reason_id: Option<String>,
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub related_entities: Vec<RelatedEntityPayload>,
}

/// A claim may resolve into a return or a change, referenced here.
#[derive(Debug, Clone, Deserialize)]
pub struct RelatedEntityPayload {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReturnPayload {
    pub id: Option<i64>,
    pub status: Option<String>,
    pub tracking_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePayload {
    pub id: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserPayload {
    pub id: Option<i64>,
    pub nickname: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<PhonePayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhonePayload {
    pub number: Option<String>,
}

impl UserPayload {
    pub fn full_name(&self) -> Option<String> {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
            (Some(first), None) => Some(first.clone()),
            (None, Some(last)) => Some(last.clone()),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemPayload {
    pub id: Option<String>,
    pub title: Option<String>,
    pub category_id: Option<String>,
    pub condition: Option<String>,
    pub catalog_product_id: Option<String>,
    pub seller_custom_field: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogProductPayload {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub attributes: Vec<ProductAttributePayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductAttributePayload {
    pub id: Option<String>,
    pub value_name: Option<String>,
}

impl CatalogProductPayload {
    pub fn brand(&self) -> Option<String> {
        self.attributes
            .iter()
            .find(|a| a.id.as_deref() == Some("BRAND"))
            .and_then(|a| a.value_name.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackPayload {
    pub sale: Option<FeedbackEntryPayload>,
    pub purchase: Option<FeedbackEntryPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackEntryPayload {
    pub rating: Option<String>,
    pub message: Option<String>,
    pub fulfilled: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagesPayload {
    #[serde(default)]
    pub messages: Vec<MessagePayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagePayload {
    pub date_created: Option<DateTime<Utc>>,
    pub from: Option<MessageFromPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageFromPayload {
    pub user_id: Option<i64>,
}

/// Query parameters for the order-search call.
#[derive(Debug, Clone, Default)]
pub struct OrderSearchQuery {
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub limit: u32,
}

/// Seam between the pipeline and the marketplace HTTP API. The production
/// implementation is [`MarketplaceClient`]; tests substitute a fake serving
/// canned payloads.
#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    async fn search_orders(
        &self,
        credential: &Credential,
        query: &OrderSearchQuery,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<OrderSearchPayload>, UpstreamError>;

    async fn order_detail(
        &self,
        credential: &Credential,
        order_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<OrderDetailPayload>, UpstreamError>;

    async fn payment_detail(
        &self,
        credential: &Credential,
        payment_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<PaymentPayload>, UpstreamError>;

    async fn shipment_detail(
        &self,
        credential: &Credential,
        shipment_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<ShipmentPayload>, UpstreamError>;

    async fn claims_for_order(
        &self,
        credential: &Credential,
        order_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<ClaimSearchPayload>, UpstreamError>;

    async fn return_detail(
        &self,
        credential: &Credential,
        return_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<ReturnPayload>, UpstreamError>;

    async fn change_detail(
        &self,
        credential: &Credential,
        change_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<ChangePayload>, UpstreamError>;

    async fn user_detail(
        &self,
        credential: &Credential,
        user_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<UserPayload>, UpstreamError>;

    async fn item_detail(
        &self,
        credential: &Credential,
        item_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<ItemPayload>, UpstreamError>;

    async fn catalog_product_detail(
        &self,
        credential: &Credential,
        product_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<CatalogProductPayload>, UpstreamError>;

    async fn order_feedback(
        &self,
        credential: &Credential,
        order_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<FeedbackPayload>, UpstreamError>;

    async fn order_messages(
        &self,
        credential: &Credential,
        pack_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<MessagesPayload>, UpstreamError>;
}

/// reqwest-backed marketplace client. Each call is a single bounded GET;
/// `retry_attempts` (default 0) adds an exponential-backoff retry budget for
/// transport errors and 5xx responses only.
#[derive(Clone)]
pub struct MarketplaceClient {
    client: Client,
    base_url: String,
    retry_attempts: u32,
}

impl MarketplaceClient {
    pub fn new(base_url: String, timeout_secs: u64, retry_attempts: u32) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .expect("failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            retry_attempts,
        }
    }

    async fn get_json(
        &self,
        endpoint: Endpoint,
        path: &str,
        query: &[(&str, String)],
        token: &str,
        endpoints: &EndpointSet,
    ) -> Result<Value, UpstreamError> {
        endpoints.record(endpoint);

        let url = format!("{}/{}", self.base_url, path);
        let mut delay = Duration::from_millis(500);
        let mut attempt = 0u32;

        loop {
            let result = self
                .client
                .get(&url)
                .bearer_auth(token)
                .header("accept", "application/json")
                .query(query)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    let body = response
                        .text()
                        .await
                        .map_err(|source| UpstreamError::Transport { endpoint, source })?;
                    return serde_json::from_str(&body)
                        .map_err(|source| UpstreamError::Decode { endpoint, source });
                }
                Ok(response) => {
                    let status = response.status();
                    if status.is_server_error() && attempt < self.retry_attempts {
                        attempt += 1;
                        tracing::warn!(
                            endpoint = %endpoint,
                            %status,
                            attempt,
                            max = self.retry_attempts,
                            "Upstream call failed, retrying after {:?}",
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                        continue;
                    }
                    let body = response.text().await.unwrap_or_default();
                    return Err(UpstreamError::Status {
                        endpoint,
                        status,
                        body: truncate_body(&body),
                    });
                }
                Err(source) => {
                    if attempt < self.retry_attempts {
                        attempt += 1;
                        tracing::warn!(
                            endpoint = %endpoint,
                            attempt,
                            max = self.retry_attempts,
                            error = %source,
                            "Upstream request error, retrying after {:?}",
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                        continue;
                    }
                    return Err(UpstreamError::Transport { endpoint, source });
                }
            }
        }
    }
}

/// Error bodies can be arbitrarily large; keep the first part only.
fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    }
}

#[async_trait]
impl MarketplaceApi for MarketplaceClient {
    async fn search_orders(
        &self,
        credential: &Credential,
        query: &OrderSearchQuery,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<OrderSearchPayload>, UpstreamError> {
        let mut params = vec![
            ("seller", credential.seller_id.clone()),
            ("sort", "date_desc".to_string()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(from) = query.date_from {
            params.push(("order.date_created.from", from.to_rfc3339()));
        }
        if let Some(to) = query.date_to {
            params.push(("order.date_created.to", to.to_rfc3339()));
        }

        let raw = self
            .get_json(
                Endpoint::OrdersSearch,
                "orders/search",
                &params,
                &credential.access_token,
                endpoints,
            )
            .await?;
        parse(Endpoint::OrdersSearch, raw)
    }

    async fn order_detail(
        &self,
        credential: &Credential,
        order_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<OrderDetailPayload>, UpstreamError> {
        let raw = self
            .get_json(
                Endpoint::OrderDetail,
                &format!("orders/{}", order_id),
                &[],
                &credential.access_token,
                endpoints,
            )
            .await?;
        parse(Endpoint::OrderDetail, raw)
    }

    async fn payment_detail(
        &self,
        credential: &Credential,
        payment_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<PaymentPayload>, UpstreamError> {
        let raw = self
            .get_json(
                Endpoint::PaymentDetail,
                &format!("payments/{}", payment_id),
                &[],
                &credential.access_token,
                endpoints,
            )
            .await?;
        parse(Endpoint::PaymentDetail, raw)
    }

    async fn shipment_detail(
        &self,
        credential: &Credential,
        shipment_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<ShipmentPayload>, UpstreamError> {
        let raw = self
            .get_json(
                Endpoint::ShipmentDetail,
                &format!("shipments/{}", shipment_id),
                &[],
                &credential.access_token,
                endpoints,
            )
            .await?;
        parse(Endpoint::ShipmentDetail, raw)
    }

    async fn claims_for_order(
        &self,
        credential: &Credential,
        order_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<ClaimSearchPayload>, UpstreamError> {
        let raw = self
            .get_json(
                Endpoint::ClaimsSearch,
                "post-purchase/v1/claims/search",
                &[
                    ("resource", "order".to_string()),
                    ("resource_id", order_id.to_string()),
                ],
                &credential.access_token,
                endpoints,
            )
            .await?;
        parse(Endpoint::ClaimsSearch, raw)
    }

    async fn return_detail(
        &self,
        credential: &Credential,
        return_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<ReturnPayload>, UpstreamError> {
        let raw = self
            .get_json(
                Endpoint::ReturnDetail,
                &format!("post-purchase/v1/returns/{}", return_id),
                &[],
                &credential.access_token,
                endpoints,
            )
            .await?;
        parse(Endpoint::ReturnDetail, raw)
    }

    async fn change_detail(
        &self,
        credential: &Credential,
        change_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<ChangePayload>, UpstreamError> {
        let raw = self
            .get_json(
                Endpoint::ChangeDetail,
                &format!("post-purchase/v1/changes/{}", change_id),
                &[],
                &credential.access_token,
                endpoints,
            )
            .await?;
        parse(Endpoint::ChangeDetail, raw)
    }

    async fn user_detail(
        &self,
        credential: &Credential,
        user_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<UserPayload>, UpstreamError> {
        let raw = self
            .get_json(
                Endpoint::UserDetail,
                &format!("users/{}", user_id),
                &[],
                &credential.access_token,
                endpoints,
            )
            .await?;
        parse(Endpoint::UserDetail, raw)
    }

    async fn item_detail(
        &self,
        credential: &Credential,
        item_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<ItemPayload>, UpstreamError> {
        let raw = self
            .get_json(
                Endpoint::ItemDetail,
                &format!("items/{}", item_id),
                &[],
                &credential.access_token,
                endpoints,
            )
            .await?;
        parse(Endpoint::ItemDetail, raw)
    }

    async fn catalog_product_detail(
        &self,
        credential: &Credential,
        product_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<CatalogProductPayload>, UpstreamError> {
        let raw = self
            .get_json(
                Endpoint::CatalogProductDetail,
                &format!("products/{}", product_id),
                &[],
                &credential.access_token,
                endpoints,
            )
            .await?;
        parse(Endpoint::CatalogProductDetail, raw)
    }

    async fn order_feedback(
        &self,
        credential: &Credential,
        order_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<FeedbackPayload>, UpstreamError> {
        let raw = self
            .get_json(
                Endpoint::OrderFeedback,
                &format!("orders/{}/feedback", order_id),
                &[],
                &credential.access_token,
                endpoints,
            )
            .await?;
        parse(Endpoint::OrderFeedback, raw)
    }

    async fn order_messages(
        &self,
        credential: &Credential,
        pack_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<MessagesPayload>, UpstreamError> {
        let raw = self
            .get_json(
                Endpoint::OrderMessages,
                &format!("messages/packs/{}", pack_id),
                &[],
                &credential.access_token,
                endpoints,
            )
            .await?;
        parse(Endpoint::OrderMessages, raw)
    }
}
