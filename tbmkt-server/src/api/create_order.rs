use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tbmkt_core::entities::order::OrderDraft;
use tbmkt_core::utils::from_unix_seconds;
use tbmkt_sdk::objects::CreateOrderRequest;

use super::{ApiError, to_response};
use crate::state::AppState;

/// `POST /marketplace/orders` — create a listing or bid.
///
/// Validation failures return the structured rejection body with its
/// code doubling as the HTTP status.
pub(super) async fn create_order(
    state: State<AppState>,
    Json(body): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let expiry = from_unix_seconds(body.expiry)
        .ok_or(ApiError::BadRequest("expiry is not a valid unix timestamp"))?;

    let draft = OrderDraft {
        order_type: body.kind.into(),
        collection: body.collection,
        currency: body.currency,
        participant: body.participant,
        chain_id: body.chain_id,
        token_id: body.token_id,
        amount: body.amount,
        nonce: body.nonce,
        expiry,
        signature: body.signature,
    };

    let order = state.service.create_order(draft).await?;
    Ok((StatusCode::CREATED, Json(to_response(order))))
}
