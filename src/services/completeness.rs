//! Completeness scoring.
//!
//! A fixed list of important fields spanning the order, item, payment,
//! shipping and buyer/seller sections. The score is the percentage of those
//! fields populated on the finalized record, recomputed from scratch on
//! every enrichment pass.

use crate::models::sale::EnrichedSale;

type FieldCheck = fn(&EnrichedSale) -> bool;

pub const IMPORTANT_FIELDS: &[(&str, FieldCheck)] = &[
    ("order.status", |s| {
        field(s.order.as_ref().and_then(|o| o.status.as_deref()))
    }),
    ("order.date_created", |s| {
        s.order.as_ref().and_then(|o| o.date_created).is_some()
    }),
    ("order.total_amount", |s| {
        s.order.as_ref().and_then(|o| o.total_amount).is_some()
    }),
    ("item.title", |s| {
        field(s.item.as_ref().and_then(|i| i.title.as_deref()))
    }),
    ("item.quantity", |s| {
        s.item.as_ref().and_then(|i| i.quantity).is_some()
    }),
    ("item.unit_price", |s| {
        s.item.as_ref().and_then(|i| i.unit_price).is_some()
    }),
    ("payment.status", |s| {
        field(s.payment.as_ref().and_then(|p| p.status.as_deref()))
    }),
    ("payment.transaction_amount", |s| {
        s.payment.as_ref().and_then(|p| p.transaction_amount).is_some()
    }),
    ("shipping.status", |s| {
        field(s.shipping.as_ref().and_then(|sh| sh.status.as_deref()))
    }),
    ("shipping.tracking_number", |s| {
        field(s.shipping.as_ref().and_then(|sh| sh.tracking_number.as_deref()))
    }),
    ("contacts.buyer_nickname", |s| {
        field(s.contacts.as_ref().and_then(|c| c.buyer_nickname.as_deref()))
    }),
    ("contacts.seller_nickname", |s| {
        field(s.contacts.as_ref().and_then(|c| c.seller_nickname.as_deref()))
    }),
];

fn field(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

/// `round(100 * filled / N)` over [`IMPORTANT_FIELDS`]. Pure, deterministic.
pub fn score(sale: &EnrichedSale) -> i32 {
    let total = IMPORTANT_FIELDS.len();
    let filled = IMPORTANT_FIELDS
        .iter()
        .filter(|(_, check)| check(sale))
        .count();

    (100.0 * filled as f64 / total as f64).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sale::{
        ContactsSection, ItemSection, OrderSection, PaymentSection, RawPayloads, ShippingSection,
    };
    use chrono::Utc;

    fn empty_sale() -> EnrichedSale {
        EnrichedSale {
            order_id: "1".to_string(),
            account_ref: "acct".to_string(),
            seller_id: "22".to_string(),
            order: None,
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

    fn full_sale() -> EnrichedSale {
        let mut sale = empty_sale();
        sale.order = Some(OrderSection {
            status: Some("paid".to_string()),
            date_created: Some(Utc::now()),
            total_amount: Some(100.0),
            ..Default::default()
        });
        sale.item = Some(ItemSection {
            title: Some("Widget".to_string()),
            quantity: Some(1),
            unit_price: Some(100.0),
            ..Default::default()
        });
        sale.payment = Some(PaymentSection {
            status: Some("approved".to_string()),
            transaction_amount: Some(100.0),
            ..Default::default()
        });
        sale.shipping = Some(ShippingSection {
            status: Some("delivered".to_string()),
            tracking_number: Some("TRK1".to_string()),
            ..Default::default()
        });
        sale.contacts = Some(ContactsSection {
            buyer_nickname: Some("BUYER".to_string()),
            seller_nickname: Some("SELLER".to_string()),
            ..Default::default()
        });
        sale
    }

    #[test]
    fn test_score_empty_record_is_zero() {
        assert_eq!(score(&empty_sale()), 0);
    }

    #[test]
    fn test_score_full_record_is_hundred() {
        assert_eq!(score(&full_sale()), 100);
    }

    #[test]
    fn test_score_rounds_to_nearest() {
        // 5 of 12 fields -> 41.66.. -> 42
        let mut sale = empty_sale();
        sale.order = Some(OrderSection {
            status: Some("paid".to_string()),
            date_created: Some(Utc::now()),
            total_amount: Some(50.0),
            ..Default::default()
        });
        sale.payment = Some(PaymentSection {
            status: Some("approved".to_string()),
            transaction_amount: Some(50.0),
            ..Default::default()
        });
        assert_eq!(IMPORTANT_FIELDS.len(), 12);
        assert_eq!(score(&sale), 42);
    }

    #[test]
    fn test_empty_strings_do_not_count() {
        let mut sale = empty_sale();
        sale.order = Some(OrderSection {
            status: Some(String::new()),
            ..Default::default()
        });
        assert_eq!(score(&sale), 0);
    }
}
