use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use std::sync::Arc;

use crate::AppState;
use crate::entities::{enriched_sales, prelude::*};
use crate::models::sync::{ErrorResponse, SalesListResponse, SalesQuery, SyncRequest, SyncResponse};
use crate::services::marketplace::MarketplaceApi;
use crate::services::sales_store::SeaOrmSaleStore;
use crate::services::sales_sync::{self, BatchError, BatchOptions};

/// Trigger one enrichment batch for an account.
pub async fn trigger_sync(
    State(state): State<AppState>,
    Json(payload): Json<SyncRequest>,
) -> Result<(StatusCode, Json<SyncResponse>), (StatusCode, Json<ErrorResponse>)> {
    let store = SeaOrmSaleStore::new(state.db.clone());
    let options = BatchOptions {
        date_from: payload.date_from,
        date_to: payload.date_to,
        limit: payload.limit,
    };

    let result = sales_sync::run_batch(
        state.marketplace.clone() as Arc<dyn MarketplaceApi>,
        &store,
        state.credentials.as_ref(),
        &payload.account_ref,
        &options,
        &state.sync_config,
    )
    .await
    .map_err(|e| {
        let status = match &e {
            BatchError::Credential(_) => StatusCode::BAD_REQUEST,
            BatchError::Search(_) => StatusCode::BAD_GATEWAY,
            BatchError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BatchError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        };
        (status, Json(ErrorResponse { error: e.to_string() }))
    })?;

    Ok((
        StatusCode::OK,
        Json(SyncResponse {
            success: true,
            count: result.count,
            duration_ms: result.duration_ms,
            endpoints_accessed: result.endpoints_accessed,
            order_ids: result.records.iter().map(|r| r.order_id.clone()).collect(),
        }),
    ))
}

pub async fn list_sales(
    State(state): State<AppState>,
    Query(query): Query<SalesQuery>,
) -> Result<Json<SalesListResponse>, (StatusCode, Json<ErrorResponse>)> {
    let mut select = EnrichedSales::find()
        .order_by_desc(enriched_sales::Column::LastSync)
        .limit(query.limit.unwrap_or(50))
        .offset(query.offset.unwrap_or(0));

    if let Some(account_ref) = &query.account_ref {
        select = select.filter(enriched_sales::Column::AccountRef.eq(account_ref.as_str()));
    }

    let sales = select.all(&state.db).await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Database error: {}", e),
            }),
        )
    })?;

    Ok(Json(SalesListResponse { sales }))
}

pub async fn get_sale(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<enriched_sales::Model>, (StatusCode, Json<ErrorResponse>)> {
    let sale = EnrichedSales::find_by_id(order_id.clone())
        .one(&state.db)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Database error: {}", e),
                }),
            )
        })?;

    match sale {
        Some(sale) => Ok(Json(sale)),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("No enriched sale for order {}", order_id),
            }),
        )),
    }
}
