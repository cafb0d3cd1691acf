//! Application state shared across all request handlers.

use std::sync::Arc;
use tbmkt_core::events::ChainEventSender;
use tbmkt_core::marketplace::MarketplaceService;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc
/// or is a handle).
#[derive(Clone)]
pub struct AppState {
    /// The order lifecycle service.
    pub service: Arc<MarketplaceService>,
    /// Sender half of the chain event channel, fed by the webhook
    /// endpoint and drained by the ingestor.
    pub chain_events: ChainEventSender,
}

impl AppState {
    pub fn new(service: Arc<MarketplaceService>, chain_events: ChainEventSender) -> Self {
        Self {
            service,
            chain_events,
        }
    }
}
