use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tbmkt_sdk::objects::EventDelivery;
use tokio::sync::mpsc::error::TrySendError;

use super::ApiError;
use crate::state::AppState;

/// `POST /webhook/events` — accept a chain event delivery.
///
/// The event is queued for the ingestor and the endpoint returns
/// immediately; 202 only means "queued". Deliveries are at-least-once
/// upstream, so a 503 under backpressure is safe: the sender retries
/// and the tx-hash claim deduplicates.
pub(super) async fn receive_chain_event(
    state: State<AppState>,
    Json(delivery): Json<EventDelivery>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!(
        chain_id = %delivery.chain_id,
        tx_hash = %delivery.tx_hash,
        "Received chain event delivery"
    );

    match state.chain_events.try_send(delivery) {
        Ok(()) => Ok(StatusCode::ACCEPTED),
        Err(TrySendError::Full(_)) => {
            tracing::warn!("Chain event channel full, asking sender to retry");
            Err(ApiError::IngestUnavailable)
        }
        Err(TrySendError::Closed(_)) => {
            tracing::error!("Chain event channel closed");
            Err(ApiError::IngestUnavailable)
        }
    }
}
