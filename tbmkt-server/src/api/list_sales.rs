use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tbmkt_core::entities::sale::SaleFilter;

use super::{ApiError, to_sale_response};
use crate::state::AppState;

/// `GET /marketplace/sales` query parameters. Every filter is
/// optional; `participant` matches either side of the trade.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ListSalesQuery {
    chain_id: Option<String>,
    collection: Option<String>,
    token_id: Option<i64>,
    participant: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

/// `GET /marketplace/sales` — settled trades, newest first.
pub(super) async fn list_sales(
    state: State<AppState>,
    Query(query): Query<ListSalesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let defaults = SaleFilter::default();
    let filter = SaleFilter {
        chain_id: query.chain_id.map(|s| s.to_lowercase()),
        collection: query.collection.map(|s| s.to_lowercase()),
        token_id: query.token_id,
        participant: query.participant.map(|s| s.to_lowercase()),
        limit: query.limit.unwrap_or(defaults.limit),
        offset: query.offset.unwrap_or(defaults.offset),
    };

    let rows = state.service.list_sales(filter).await?;
    let sales: Vec<_> = rows.into_iter().map(to_sale_response).collect();
    Ok(Json(sales))
}
