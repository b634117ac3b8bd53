//! Per-order enrichment coordinator.
//!
//! Seeds a fresh record from the order summary, fans out to all eight
//! section enrichers concurrently, joins them all (never fail-fast), merges
//! whatever succeeded, then scores and stamps the result. A section failure
//! lands in `sync_errors`; it never aborts the order.

use chrono::Utc;
use serde_json::Value;
use std::time::Instant;

use crate::models::sale::{EnrichedSale, OrderSummary, SyncError};
use crate::services::completeness;
use crate::services::credentials::Credential;
use crate::services::marketplace::{EndpointSet, MarketplaceApi};
use crate::services::sections::{self, SectionResult};

pub async fn enrich_sale(
    api: &dyn MarketplaceApi,
    summary: &OrderSummary,
    credential: &Credential,
    account_ref: &str,
) -> EnrichedSale {
    let started = Instant::now();
    let endpoints = EndpointSet::new();
    let mut sale = EnrichedSale::from_summary(summary, account_ref, &credential.seller_id);

    tracing::debug!(order_id = %sale.order_id, "Enriching order");

    let (order, payment, shipping, claim, contacts, item, feedback, messages) = tokio::join!(
        sections::enrich_order_detail(api, summary, credential, &endpoints),
        sections::enrich_payment(api, summary, credential, &endpoints),
        sections::enrich_shipping(api, summary, credential, &endpoints),
        sections::enrich_claims(api, summary, credential, &endpoints),
        sections::enrich_contacts(api, summary, credential, &endpoints),
        sections::enrich_item(api, summary, credential, &endpoints),
        sections::enrich_feedback(api, summary, credential, &endpoints),
        sections::enrich_messages(api, summary, credential, &endpoints),
    );

    apply(&mut sale.order, &mut sale.raw.order, &mut sale.sync_errors, order);
    apply(&mut sale.payment, &mut sale.raw.payment, &mut sale.sync_errors, payment);
    apply(&mut sale.shipping, &mut sale.raw.shipping, &mut sale.sync_errors, shipping);
    apply(&mut sale.claim, &mut sale.raw.claim, &mut sale.sync_errors, claim);
    apply(&mut sale.contacts, &mut sale.raw.contacts, &mut sale.sync_errors, contacts);
    apply(&mut sale.item, &mut sale.raw.item, &mut sale.sync_errors, item);
    apply(&mut sale.feedback, &mut sale.raw.feedback, &mut sale.sync_errors, feedback);
    apply(&mut sale.messages, &mut sale.raw.messages, &mut sale.sync_errors, messages);

    sale.completeness_score = completeness::score(&sale);
    sale.endpoints_accessed = endpoints.sorted();
    sale.sync_duration_ms = started.elapsed().as_millis() as i64;
    sale.last_sync = Utc::now();

    if sale.sync_errors.is_empty() {
        tracing::debug!(
            order_id = %sale.order_id,
            score = sale.completeness_score,
            duration_ms = sale.sync_duration_ms,
            "Order enriched"
        );
    } else {
        tracing::warn!(
            order_id = %sale.order_id,
            score = sale.completeness_score,
            failed_sections = sale.sync_errors.len(),
            "Order enriched with partial failures"
        );
    }

    sale
}

/// Merge one section result into the record. A successful section overwrites
/// its slot wholesale; a no-op leaves whatever the summary seeded; a failure
/// is recorded and the slot stays untouched.
fn apply<T>(
    slot: &mut Option<T>,
    raw_slot: &mut Option<Value>,
    errors: &mut Vec<SyncError>,
    result: SectionResult<T>,
) {
    match result {
        Ok(Some(outcome)) => {
            *slot = Some(outcome.section);
            *raw_slot = Some(outcome.raw);
        }
        Ok(None) => {}
        Err(err) => errors.push(SyncError {
            step: err.section.to_string(),
            error: err.source.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::marketplace::{Endpoint, UpstreamError};
    use crate::services::sections::{SectionError, SectionName, SectionOutcome};
    use reqwest::StatusCode;

    #[test]
    fn test_apply_success_overwrites_slot() {
        let mut slot = Some(1u8);
        let mut raw = None;
        let mut errors = Vec::new();

        apply(
            &mut slot,
            &mut raw,
            &mut errors,
            Ok(Some(SectionOutcome {
                section: 2u8,
                raw: serde_json::json!({"x": 1}),
            })),
        );

        assert_eq!(slot, Some(2));
        assert!(raw.is_some());
        assert!(errors.is_empty());
    }

    #[test]
    fn test_apply_failure_keeps_seed_and_records_error() {
        let mut slot = Some(1u8);
        let mut raw = None;
        let mut errors = Vec::new();

        let result: SectionResult<u8> = Err(SectionError {
            section: SectionName::Payment,
            source: UpstreamError::Status {
                endpoint: Endpoint::PaymentDetail,
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "oops".to_string(),
            },
        });
        apply(&mut slot, &mut raw, &mut errors, result);

        assert_eq!(slot, Some(1));
        assert!(raw.is_none());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].step, "payment");
        assert!(errors[0].error.contains("500"));
    }

    #[test]
    fn test_apply_noop_leaves_everything() {
        let mut slot: Option<u8> = None;
        let mut raw = None;
        let mut errors = Vec::new();

        apply(&mut slot, &mut raw, &mut errors, Ok(None));

        assert!(slot.is_none());
        assert!(raw.is_none());
        assert!(errors.is_empty());
    }
}
