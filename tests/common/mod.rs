//! Shared test doubles: a canned-payload marketplace, an in-memory sale
//! store, and a static credential source.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use saleshub_backend::models::sale::EnrichedSale;
use saleshub_backend::services::credentials::{Credential, CredentialError, CredentialSource};
use saleshub_backend::services::marketplace::{
    CatalogProductPayload, ChangePayload, ClaimSearchPayload, Endpoint, EndpointSet,
    FeedbackPayload, Fetched, ItemPayload, MarketplaceApi, MessagesPayload, OrderDetailPayload,
    OrderSearchPayload, OrderSearchQuery, PaymentPayload, ReturnPayload, ShipmentPayload,
    UpstreamError, UserPayload,
};
use saleshub_backend::services::sales_store::{SaleStore, StoreError};

pub const BUYER_ID: i64 = 11;
pub const SELLER_ID: i64 = 22;

/// All canned payloads for one order, keyed by endpoint + path parameter.
pub struct OrderFixture {
    pub summary: Value,
    pub responses: Vec<((Endpoint, String), Value)>,
}

/// A fully-populated order: every section enricher finds data, including the
/// dependent item -> catalog-product chain.
pub fn order_fixture(order_id: i64) -> OrderFixture {
    let payment_id = order_id + 1;
    let shipping_id = order_id + 2;
    let pack_id = order_id + 3;
    let item_id = format!("MLA{}", order_id);
    let product_id = format!("PROD{}", order_id);

    let summary = json!({
        "id": order_id,
        "status": "paid",
        "date_created": "2026-08-01T12:00:00.000Z",
        "buyer": {"id": BUYER_ID, "nickname": "BUYER_ONE"},
        "seller": {"id": SELLER_ID, "nickname": "SELLER_ONE"},
        "payments": [{"id": payment_id}],
        "shipping": {"id": shipping_id},
        "pack_id": pack_id,
        "order_items": [
            {"item": {"id": item_id, "title": "Widget"}, "quantity": 2, "unit_price": 49.5}
        ]
    });

    let responses = vec![
        (
            (Endpoint::OrderDetail, order_id.to_string()),
            json!({
                "id": order_id,
                "status": "paid",
                "status_detail": null,
                "date_created": "2026-08-01T12:00:00.000Z",
                "date_closed": "2026-08-01T12:05:00.000Z",
                "total_amount": 99.0,
                "paid_amount": 99.0,
                "currency_id": "ARS",
                "tags": ["paid", "delivered"]
            }),
        ),
        (
            (Endpoint::PaymentDetail, payment_id.to_string()),
            json!({
                "id": payment_id,
                "status": "approved",
                "payment_type": "credit_card",
                "payment_method_id": "visa",
                "transaction_amount": 99.0,
                "net_received_amount": 92.5,
                "taxes_amount": 0.0,
                "shipping_cost": 0.0,
                "installments": 3,
                "date_approved": "2026-08-01T12:01:00.000Z"
            }),
        ),
        (
            (Endpoint::ShipmentDetail, shipping_id.to_string()),
            json!({
                "id": shipping_id,
                "status": "delivered",
                "substatus": null,
                "tracking_number": format!("TRK{}", order_id),
                "tracking_method": "urgent",
                "base_cost": 5.0,
                "shipping_method": {"name": "express"},
                "receiver_address": {
                    "address_line": "Av. Test 123",
                    "zip_code": "1414",
                    "city": {"name": "Buenos Aires"},
                    "state": {"name": "Capital Federal"},
                    "country": {"name": "Argentina"}
                },
                "status_history": {
                    "date_shipped": "2026-08-02T09:00:00.000Z",
                    "date_delivered": "2026-08-03T15:00:00.000Z"
                }
            }),
        ),
        (
            (Endpoint::ClaimsSearch, order_id.to_string()),
            json!({"data": []}),
        ),
        (
            (Endpoint::UserDetail, BUYER_ID.to_string()),
            json!({
                "id": BUYER_ID,
                "nickname": "BUYER_ONE",
                "first_name": "Ana",
                "last_name": "Gomez",
                "email": "ana@example.com",
                "phone": {"number": "+54 11 5555-1234"}
            }),
        ),
        (
            (Endpoint::UserDetail, SELLER_ID.to_string()),
            json!({
                "id": SELLER_ID,
                "nickname": "SELLER_ONE",
                "first_name": "Tienda",
                "last_name": "Uno",
                "email": null,
                "phone": null
            }),
        ),
        (
            (Endpoint::ItemDetail, item_id.clone()),
            json!({
                "id": item_id,
                "title": "Widget",
                "category_id": "MLA1055",
                "condition": "new",
                "catalog_product_id": product_id,
                "seller_custom_field": "SKU-42"
            }),
        ),
        (
            (Endpoint::CatalogProductDetail, product_id.clone()),
            json!({
                "id": product_id,
                "name": "Widget Pro",
                "attributes": [{"id": "BRAND", "value_name": "Acme"}]
            }),
        ),
        (
            (Endpoint::OrderFeedback, order_id.to_string()),
            json!({
                "sale": {"rating": "positive", "message": "great buyer", "fulfilled": true},
                "purchase": {"rating": "positive", "message": "fast shipping", "fulfilled": true}
            }),
        ),
        (
            (Endpoint::OrderMessages, pack_id.to_string()),
            json!({
                "messages": [
                    {"date_created": "2026-08-01T13:00:00.000Z", "from": {"user_id": BUYER_ID}},
                    {"date_created": "2026-08-02T10:00:00.000Z", "from": {"user_id": SELLER_ID}}
                ]
            }),
        ),
    ];

    OrderFixture { summary, responses }
}

/// Like [`order_fixture`], but with an open claim that resolved into a
/// return, exercising the dependent claim -> return lookup.
pub fn order_fixture_with_claim(order_id: i64) -> OrderFixture {
    let mut fixture = order_fixture(order_id);
    let claim_id = order_id + 4;
    let return_id = order_id + 5;

    for ((endpoint, key), value) in fixture.responses.iter_mut() {
        if *endpoint == Endpoint::ClaimsSearch && *key == order_id.to_string() {
            *value = json!({
                "data": [{
                    "id": claim_id,
                    "type": "mediations",
                    "status": "opened",
                    "stage": "claim",
                    "reason_id": "PDD",
                    "date_created": "2026-08-04T09:00:00.000Z",
                    "related_entities": [{"type": "return", "id": return_id}]
                }]
            });
        }
    }

    fixture.responses.push((
        (Endpoint::ReturnDetail, return_id.to_string()),
        json!({
            "id": return_id,
            "status": "shipped",
            "tracking_number": format!("RTRK{}", order_id)
        }),
    ));

    fixture
}

#[derive(Default)]
pub struct FakeMarketplace {
    orders: Vec<Value>,
    responses: HashMap<(Endpoint, String), Value>,
    failing_endpoints: HashSet<Endpoint>,
    search_fails: bool,
    search_delay: Option<std::time::Duration>,
    panic_orders: HashSet<String>,
}

impl FakeMarketplace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_order(&mut self, fixture: OrderFixture) {
        self.orders.push(fixture.summary);
        self.responses.extend(fixture.responses);
    }

    /// Every call to this endpoint answers HTTP 500.
    pub fn fail_endpoint(&mut self, endpoint: Endpoint) {
        self.failing_endpoints.insert(endpoint);
    }

    pub fn fail_search(&mut self) {
        self.search_fails = true;
    }

    /// The search call sleeps this long before answering, simulating a slow
    /// upstream that should trip the batch deadline.
    pub fn stall_search(&mut self, delay: std::time::Duration) {
        self.search_delay = Some(delay);
    }

    /// Panic inside the order-detail call for this order, simulating an
    /// unexpected failure that escapes the per-section error capture.
    pub fn panic_on_order(&mut self, order_id: &str) {
        self.panic_orders.insert(order_id.to_string());
    }

    fn respond<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        key: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<T>, UpstreamError> {
        endpoints.record(endpoint);

        if self.failing_endpoints.contains(&endpoint) {
            return Err(UpstreamError::Status {
                endpoint,
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "simulated upstream failure".to_string(),
            });
        }

        let raw = self
            .responses
            .get(&(endpoint, key.to_string()))
            .cloned()
            .ok_or_else(|| UpstreamError::Status {
                endpoint,
                status: StatusCode::NOT_FOUND,
                body: format!("no fixture for {}", key),
            })?;

        let data = serde_json::from_value(raw.clone())
            .map_err(|source| UpstreamError::Decode { endpoint, source })?;
        Ok(Fetched { data, raw })
    }
}

#[async_trait]
impl MarketplaceApi for FakeMarketplace {
    async fn search_orders(
        &self,
        _credential: &Credential,
        _query: &OrderSearchQuery,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<OrderSearchPayload>, UpstreamError> {
        endpoints.record(Endpoint::OrdersSearch);

        if let Some(delay) = self.search_delay {
            tokio::time::sleep(delay).await;
        }

        if self.search_fails {
            return Err(UpstreamError::Status {
                endpoint: Endpoint::OrdersSearch,
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "search unavailable".to_string(),
            });
        }

        let raw = json!({ "results": self.orders });
        let data =
            serde_json::from_value(raw.clone()).map_err(|source| UpstreamError::Decode {
                endpoint: Endpoint::OrdersSearch,
                source,
            })?;
        Ok(Fetched { data, raw })
    }

    async fn order_detail(
        &self,
        _credential: &Credential,
        order_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<OrderDetailPayload>, UpstreamError> {
        if self.panic_orders.contains(order_id) {
            panic!("injected failure for order {}", order_id);
        }
        self.respond(Endpoint::OrderDetail, order_id, endpoints)
    }

    async fn payment_detail(
        &self,
        _credential: &Credential,
        payment_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<PaymentPayload>, UpstreamError> {
        self.respond(Endpoint::PaymentDetail, payment_id, endpoints)
    }

    async fn shipment_detail(
        &self,
        _credential: &Credential,
        shipment_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<ShipmentPayload>, UpstreamError> {
        self.respond(Endpoint::ShipmentDetail, shipment_id, endpoints)
    }

    async fn claims_for_order(
        &self,
        _credential: &Credential,
        order_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<ClaimSearchPayload>, UpstreamError> {
        self.respond(Endpoint::ClaimsSearch, order_id, endpoints)
    }

    async fn return_detail(
        &self,
        _credential: &Credential,
        return_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<ReturnPayload>, UpstreamError> {
        self.respond(Endpoint::ReturnDetail, return_id, endpoints)
    }

    async fn change_detail(
        &self,
        _credential: &Credential,
        change_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<ChangePayload>, UpstreamError> {
        self.respond(Endpoint::ChangeDetail, change_id, endpoints)
    }

    async fn user_detail(
        &self,
        _credential: &Credential,
        user_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<UserPayload>, UpstreamError> {
        self.respond(Endpoint::UserDetail, user_id, endpoints)
    }

    async fn item_detail(
        &self,
        _credential: &Credential,
        item_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<ItemPayload>, UpstreamError> {
        self.respond(Endpoint::ItemDetail, item_id, endpoints)
    }

    async fn catalog_product_detail(
        &self,
        _credential: &Credential,
        product_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<CatalogProductPayload>, UpstreamError> {
        self.respond(Endpoint::CatalogProductDetail, product_id, endpoints)
    }

    async fn order_feedback(
        &self,
        _credential: &Credential,
        order_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<FeedbackPayload>, UpstreamError> {
        self.respond(Endpoint::OrderFeedback, order_id, endpoints)
    }

    async fn order_messages(
        &self,
        _credential: &Credential,
        pack_id: &str,
        endpoints: &EndpointSet,
    ) -> Result<Fetched<MessagesPayload>, UpstreamError> {
        self.respond(Endpoint::OrderMessages, pack_id, endpoints)
    }
}

/// Credential source answering from memory, or failing outright.
pub struct FakeCredentials {
    fail: bool,
}

impl FakeCredentials {
    pub fn valid() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl CredentialSource for FakeCredentials {
    async fn resolve(&self, account_ref: &str) -> Result<Credential, CredentialError> {
        if self.fail {
            return Err(CredentialError::NotFound(account_ref.to_string()));
        }
        Ok(Credential {
            access_token: "test-token".to_string(),
            seller_id: SELLER_ID.to_string(),
        })
    }
}

/// In-memory [`SaleStore`] with upsert semantics keyed by order id.
#[derive(Default)]
pub struct MemorySaleStore {
    sales: Mutex<HashMap<String, EnrichedSale>>,
    calls: AtomicUsize,
    fail: bool,
}

impl MemorySaleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.sales.lock().len()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn get(&self, order_id: &str) -> Option<EnrichedSale> {
        self.sales.lock().get(order_id).cloned()
    }
}

#[async_trait]
impl SaleStore for MemorySaleStore {
    async fn upsert_sales(&self, sales: &[EnrichedSale]) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail {
            return Err(StoreError::Database(sea_orm::DbErr::Custom(
                "simulated store failure".to_string(),
            )));
        }

        let mut guard = self.sales.lock();
        for sale in sales {
            guard.insert(sale.order_id.clone(), sale.clone());
        }
        Ok(())
    }
}
