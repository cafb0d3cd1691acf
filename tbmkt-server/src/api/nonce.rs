use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Serialize;

use super::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
struct NonceResponse {
    /// Highest nonce this participant has ever used on the chain.
    nonce: i64,
}

/// `GET /marketplace/nonce/{chain_id}/{participant}` — the nonce
/// watermark a client should exceed for its next order.
pub(super) async fn get_nonce(
    state: State<AppState>,
    Path((chain_id, participant)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let nonce = state.service.nonce_watermark(&chain_id, &participant).await?;
    Ok(Json(NonceResponse { nonce }))
}
