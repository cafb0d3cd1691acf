use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tbmkt_core::entities::order::OrderFilter;
use tbmkt_sdk::objects::{OrderKind, OrderState};

use super::{ApiError, to_joined_response};
use crate::state::AppState;

/// `GET /marketplace/orders` query parameters. Every filter is
/// optional; stale and expired orders are never returned.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ListOrdersQuery {
    chain_id: Option<String>,
    collection: Option<String>,
    currency: Option<String>,
    participant: Option<String>,
    token_id: Option<i64>,
    #[serde(rename = "type")]
    kind: Option<OrderKind>,
    status: Option<OrderState>,
    owner_address: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

/// `GET /marketplace/orders` — the live order book read path.
pub(super) async fn list_orders(
    state: State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let defaults = OrderFilter::default();
    let filter = OrderFilter {
        chain_id: query.chain_id.map(|s| s.to_lowercase()),
        collection: query.collection.map(|s| s.to_lowercase()),
        currency: query.currency.map(|s| s.to_lowercase()),
        participant: query.participant.map(|s| s.to_lowercase()),
        token_id: query.token_id,
        order_type: query.kind.map(Into::into),
        status: query.status.map(Into::into),
        owner_address: query.owner_address.map(|s| s.to_lowercase()),
        limit: query.limit.unwrap_or(defaults.limit),
        offset: query.offset.unwrap_or(defaults.offset),
    };

    let rows = state.service.list_orders(filter).await?;
    let orders: Vec<_> = rows.into_iter().map(to_joined_response).collect();
    Ok(Json(orders))
}
