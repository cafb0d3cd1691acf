use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tbmkt_core::entities::order::OrderSelector;
use tbmkt_sdk::objects::{CancellationAck, CancellationRequest};

use super::ApiError;
use crate::state::AppState;

/// `POST /marketplace/orders/cancellations` — flag orders as
/// cancellation-in-flight.
///
/// The orders stay reserved until the on-chain cancellation confirms,
/// or revert to ACTIVE once the confirmation timeout lapses.
pub(super) async fn cancel_order(
    state: State<AppState>,
    Json(body): Json<CancellationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let selector = OrderSelector::from(body);
    let updated = state.service.request_cancellation(selector).await?;
    Ok((StatusCode::ACCEPTED, Json(CancellationAck { updated })))
}
