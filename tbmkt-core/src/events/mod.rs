//! Channel infrastructure for chain event ingestion.
//!
//! The HTTP webhook endpoint is the producer: it pushes each received
//! `EventDelivery` onto a bounded mpsc channel and returns immediately.
//! The `ChainEventIngestor` is the single consumer; it deduplicates by
//! transaction hash and dispatches to the lifecycle service.

use tbmkt_sdk::objects::EventDelivery;
use tokio::sync::mpsc;

/// Default buffer size for event channels.
///
/// Enough to absorb webhook bursts while keeping memory bounded; the
/// endpoint reports backpressure once the buffer fills.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for chain event deliveries.
pub type ChainEventSender = mpsc::Sender<EventDelivery>;
/// Receiver handle for chain event deliveries.
pub type ChainEventReceiver = mpsc::Receiver<EventDelivery>;

/// Create a new chain event channel.
///
/// Multiple senders can be cloned from the returned sender; the
/// receiver belongs to the ingestor.
pub fn chain_event_channel() -> (ChainEventSender, ChainEventReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}
