//! Section enrichers.
//!
//! Each enricher owns one namespaced slice of the enriched record. It decides
//! whether the order summary carries enough information to act (a missing
//! prerequisite id is a legitimate no-op, not a failure), performs its
//! upstream call(s), and returns either its fully-populated section or a
//! [`SectionError`]. A failed section never partially populates its fields,
//! and never affects sibling sections.

use serde_json::{Value, json};
use std::fmt;

use crate::models::sale::{
    ClaimSection, ContactsSection, FeedbackSection, ItemSection, MessagesSection, OrderSection,
    OrderSummary, PaymentSection, ShippingSection,
};
use crate::services::credentials::Credential;
use crate::services::marketplace::{EndpointSet, MarketplaceApi, UpstreamError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionName {
    OrderDetail,
    Payment,
    Shipping,
    Claims,
    Contacts,
    Item,
    Feedback,
    Messages,
}

impl SectionName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionName::OrderDetail => "order_detail",
            SectionName::Payment => "payment",
            SectionName::Shipping => "shipping",
            SectionName::Claims => "claims",
            SectionName::Contacts => "contacts",
            SectionName::Item => "item",
            SectionName::Feedback => "feedback",
            SectionName::Messages => "messages",
        }
    }
}

impl fmt::Display for SectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{section} enrichment failed: {source}")]
pub struct SectionError {
    pub section: SectionName,
    #[source]
    pub source: UpstreamError,
}

/// A section's parsed fields plus the verbatim payload(s) they came from.
#[derive(Debug)]
pub struct SectionOutcome<T> {
    pub section: T,
    pub raw: Value,
}

pub type SectionResult<T> = Result<Option<SectionOutcome<T>>, SectionError>;

fn fail(section: SectionName) -> impl FnOnce(UpstreamError) -> SectionError {
    move |source| SectionError { section, source }
}

pub async fn enrich_order_detail(
    api: &dyn MarketplaceApi,
    summary: &OrderSummary,
    credential: &Credential,
    endpoints: &EndpointSet,
) -> SectionResult<OrderSection> {
    let fetched = api
        .order_detail(credential, &summary.id, endpoints)
        .await
        .map_err(fail(SectionName::OrderDetail))?;

    let detail = fetched.data;
    Ok(Some(SectionOutcome {
        section: OrderSection {
            status: detail.status,
            status_detail: detail.status_detail,
            date_created: detail.date_created,
            date_closed: detail.date_closed,
            total_amount: detail.total_amount,
            paid_amount: detail.paid_amount,
            currency: detail.currency_id,
            tags: detail.tags,
        },
        raw: fetched.raw,
    }))
}

/// Payment details for the order's primary payment. An order can carry
/// several payments; this section reflects the first one, and the full id
/// list stays on the summary for callers that need the rest.
pub async fn enrich_payment(
    api: &dyn MarketplaceApi,
    summary: &OrderSummary,
    credential: &Credential,
    endpoints: &EndpointSet,
) -> SectionResult<PaymentSection> {
    let Some(payment_id) = summary.payment_ids.first() else {
        return Ok(None);
    };

    let fetched = api
        .payment_detail(credential, payment_id, endpoints)
        .await
        .map_err(fail(SectionName::Payment))?;

    let payment = fetched.data;
    Ok(Some(SectionOutcome {
        section: PaymentSection {
            payment_id: payment.id.map(|id| id.to_string()),
            status: payment.status,
            payment_type: payment.payment_type,
            payment_method: payment.payment_method_id,
            transaction_amount: payment.transaction_amount,
            net_received_amount: payment.net_received_amount,
            taxes_amount: payment.taxes_amount,
            shipping_cost: payment.shipping_cost,
            installments: payment.installments,
            date_approved: payment.date_approved,
        },
        raw: fetched.raw,
    }))
}

pub async fn enrich_shipping(
    api: &dyn MarketplaceApi,
    summary: &OrderSummary,
    credential: &Credential,
    endpoints: &EndpointSet,
) -> SectionResult<ShippingSection> {
    let Some(shipping_id) = summary.shipping_id.as_deref() else {
        return Ok(None);
    };

    let fetched = api
        .shipment_detail(credential, shipping_id, endpoints)
        .await
        .map_err(fail(SectionName::Shipping))?;

    let shipment = fetched.data;
    let address = shipment.receiver_address;
    let history = shipment.status_history;
    Ok(Some(SectionOutcome {
        section: ShippingSection {
            shipment_id: shipment.id.map(|id| id.to_string()),
            status: shipment.status,
            substatus: shipment.substatus,
            tracking_number: shipment.tracking_number,
            carrier: shipment.tracking_method,
            shipping_method: shipment.shipping_method.and_then(|m| m.name),
            address_line: address.as_ref().and_then(|a| a.address_line.clone()),
            city: address
                .as_ref()
                .and_then(|a| a.city.as_ref())
                .and_then(|c| c.name.clone()),
            state: address
                .as_ref()
                .and_then(|a| a.state.as_ref())
                .and_then(|s| s.name.clone()),
            zip_code: address.as_ref().and_then(|a| a.zip_code.clone()),
            country: address
                .as_ref()
                .and_then(|a| a.country.as_ref())
                .and_then(|c| c.name.clone()),
            date_shipped: history.as_ref().and_then(|h| h.date_shipped),
            date_delivered: history.as_ref().and_then(|h| h.date_delivered),
            cost: shipment.base_cost,
        },
        raw: fetched.raw,
    }))
}

/// Claims are looked up by order. When a claim resolved into a return or a
/// change, the related resource is fetched in a dependent second call; that
/// chain stays internal to this section.
pub async fn enrich_claims(
    api: &dyn MarketplaceApi,
    summary: &OrderSummary,
    credential: &Credential,
    endpoints: &EndpointSet,
) -> SectionResult<ClaimSection> {
    let fetched = api
        .claims_for_order(credential, &summary.id, endpoints)
        .await
        .map_err(fail(SectionName::Claims))?;

    // No claim on this order is the common case, not an error.
    let Some(claim) = fetched.data.data.into_iter().next() else {
        return Ok(None);
    };

    let mut section = ClaimSection {
        claim_id: claim.id.map(|id| id.to_string()),
        claim_type: claim.claim_type,
        claim_status: claim.status,
        claim_stage: claim.stage,
        reason: claim.reason_id,
        date_created: claim.date_created,
        ..Default::default()
    };

    let mut raw_return = Value::Null;
    let mut raw_change = Value::Null;

    let related = claim
        .related_entities
        .iter()
        .find(|r| matches!(r.kind.as_deref(), Some("return") | Some("change")));

    if let Some(related) = related {
        let related_id = related.id.map(|id| id.to_string());
        match (related.kind.as_deref(), related_id) {
            (Some("return"), Some(return_id)) => {
                let ret = api
                    .return_detail(credential, &return_id, endpoints)
                    .await
                    .map_err(fail(SectionName::Claims))?;
                section.resolution = Some("return".to_string());
                section.return_id = ret.data.id.map(|id| id.to_string()).or(Some(return_id));
                section.return_status = ret.data.status;
                section.return_tracking_number = ret.data.tracking_number;
                raw_return = ret.raw;
            }
            (Some("change"), Some(change_id)) => {
                let change = api
                    .change_detail(credential, &change_id, endpoints)
                    .await
                    .map_err(fail(SectionName::Claims))?;
                section.resolution = Some("change".to_string());
                section.change_id = change.data.id.map(|id| id.to_string()).or(Some(change_id));
                section.change_status = change.data.status;
                raw_change = change.raw;
            }
            _ => {}
        }
    }

    Ok(Some(SectionOutcome {
        section,
        raw: json!({
            "claims": fetched.raw,
            "return": raw_return,
            "change": raw_change,
        }),
    }))
}

/// Buyer and seller identity. Both lookups run as one section: either
/// resolves fully or the whole section is reported as failed.
pub async fn enrich_contacts(
    api: &dyn MarketplaceApi,
    summary: &OrderSummary,
    credential: &Credential,
    endpoints: &EndpointSet,
) -> SectionResult<ContactsSection> {
    if summary.buyer_id.is_none() && summary.seller_id.is_none() {
        return Ok(None);
    }

    let mut section = ContactsSection::default();
    let mut raw_buyer = Value::Null;
    let mut raw_seller = Value::Null;

    if let Some(buyer_id) = summary.buyer_id.as_deref() {
        let buyer = api
            .user_detail(credential, buyer_id, endpoints)
            .await
            .map_err(fail(SectionName::Contacts))?;
        section.buyer_nickname = buyer.data.nickname.clone();
        section.buyer_name = buyer.data.full_name();
        section.buyer_email = buyer.data.email.clone();
        section.buyer_phone = buyer.data.phone.as_ref().and_then(|p| p.number.clone());
        raw_buyer = buyer.raw;
    }

    if let Some(seller_id) = summary.seller_id.as_deref() {
        let seller = api
            .user_detail(credential, seller_id, endpoints)
            .await
            .map_err(fail(SectionName::Contacts))?;
        section.seller_nickname = seller.data.nickname.clone();
        section.seller_name = seller.data.full_name();
        raw_seller = seller.raw;
    }

    Ok(Some(SectionOutcome {
        section,
        raw: json!({ "buyer": raw_buyer, "seller": raw_seller }),
    }))
}

/// Catalog item lookup, with a dependent catalog-product fetch when the item
/// is attached to a catalog listing.
pub async fn enrich_item(
    api: &dyn MarketplaceApi,
    summary: &OrderSummary,
    credential: &Credential,
    endpoints: &EndpointSet,
) -> SectionResult<ItemSection> {
    let Some(line) = summary.line_items.first() else {
        return Ok(None);
    };
    let Some(item_id) = line.item_id.as_deref() else {
        return Ok(None);
    };

    let fetched = api
        .item_detail(credential, item_id, endpoints)
        .await
        .map_err(fail(SectionName::Item))?;

    let item = fetched.data;
    let mut section = ItemSection {
        item_id: item.id,
        title: item.title.or_else(|| line.title.clone()),
        category_id: item.category_id,
        quantity: line.quantity,
        unit_price: line.unit_price,
        sku: item.seller_custom_field,
        condition: item.condition,
        catalog_product_id: item.catalog_product_id.clone(),
        ..Default::default()
    };

    let mut raw_product = Value::Null;
    if let Some(product_id) = item.catalog_product_id.as_deref() {
        let product = api
            .catalog_product_detail(credential, product_id, endpoints)
            .await
            .map_err(fail(SectionName::Item))?;
        section.catalog_product_name = product.data.name.clone();
        section.brand = product.data.brand();
        raw_product = product.raw;
    }

    Ok(Some(SectionOutcome {
        section,
        raw: json!({ "item": fetched.raw, "product": raw_product }),
    }))
}

pub async fn enrich_feedback(
    api: &dyn MarketplaceApi,
    summary: &OrderSummary,
    credential: &Credential,
    endpoints: &EndpointSet,
) -> SectionResult<FeedbackSection> {
    let fetched = api
        .order_feedback(credential, &summary.id, endpoints)
        .await
        .map_err(fail(SectionName::Feedback))?;

    let feedback = fetched.data;
    if feedback.sale.is_none() && feedback.purchase.is_none() {
        return Ok(None);
    }

    let purchase = feedback.purchase;
    let sale = feedback.sale;
    Ok(Some(SectionOutcome {
        section: FeedbackSection {
            buyer_rating: purchase.as_ref().and_then(|f| f.rating.clone()),
            buyer_comment: purchase.as_ref().and_then(|f| f.message.clone()),
            buyer_fulfilled: purchase.as_ref().and_then(|f| f.fulfilled),
            seller_rating: sale.as_ref().and_then(|f| f.rating.clone()),
            seller_comment: sale.as_ref().and_then(|f| f.message.clone()),
        },
        raw: fetched.raw,
    }))
}

pub async fn enrich_messages(
    api: &dyn MarketplaceApi,
    summary: &OrderSummary,
    credential: &Credential,
    endpoints: &EndpointSet,
) -> SectionResult<MessagesSection> {
    // Messages hang off the pack when the order belongs to one.
    let pack_id = summary.pack_id.as_deref().unwrap_or(&summary.id);

    let fetched = api
        .order_messages(credential, pack_id, endpoints)
        .await
        .map_err(fail(SectionName::Messages))?;

    let messages = fetched.data.messages;
    if messages.is_empty() {
        return Ok(None);
    }

    let last = messages
        .iter()
        .filter(|m| m.date_created.is_some())
        .max_by_key(|m| m.date_created);

    let last_from = last
        .and_then(|m| m.from.as_ref())
        .and_then(|f| f.user_id)
        .map(|user_id| {
            let user_id = user_id.to_string();
            if summary.buyer_id.as_deref() == Some(user_id.as_str()) {
                "buyer".to_string()
            } else if summary.seller_id.as_deref() == Some(user_id.as_str()) {
                "seller".to_string()
            } else {
                user_id
            }
        });

    Ok(Some(SectionOutcome {
        section: MessagesSection {
            message_count: Some(messages.len() as i32),
            last_message_date: last.and_then(|m| m.date_created),
            last_message_from: last_from,
        },
        raw: fetched.raw,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_names() {
        assert_eq!(SectionName::OrderDetail.as_str(), "order_detail");
        assert_eq!(SectionName::Claims.to_string(), "claims");
    }
}
