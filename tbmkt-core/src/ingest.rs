//! Chain event ingestion.
//!
//! `ChainEventIngestor` consumes `EventDelivery` messages from the
//! webhook channel, claims each transaction hash exactly once, and
//! dispatches the decoded event to the lifecycle service. Deliveries
//! are at-least-once upstream; the tx-hash claim makes application
//! at-most-once, so the pipeline as a whole is idempotent.
//!
//! Ordering: decode first (an undecodable payload is never claimed, so
//! a later corrected delivery can still apply), claim second, side
//! effects last.

use crate::entities::order::{NonceFilter, OrderSelector};
use crate::entities::sale::Settlement;
use crate::events::ChainEventReceiver;
use crate::framework::DatabaseProcessor;
use crate::marketplace::{MarketplaceError, MarketplaceService};
use crate::entities::processed_event::TryMarkEventProcessed;
use kanau::processor::Processor;
use sqlx::PgPool;
use std::sync::Arc;
use tbmkt_sdk::objects::{EventDelivery, MarketplaceEvent};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Errors that can occur while applying a chain event.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Lifecycle service error
    #[error(transparent)]
    Marketplace(#[from] MarketplaceError),
}

/// Single consumer of the chain event channel.
pub struct ChainEventIngestor {
    processor: DatabaseProcessor,
    service: Arc<MarketplaceService>,
    events_rx: ChainEventReceiver,
    shutdown_rx: watch::Receiver<bool>,
}

impl ChainEventIngestor {
    pub fn new(
        pool: PgPool,
        service: Arc<MarketplaceService>,
        events_rx: ChainEventReceiver,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            processor: DatabaseProcessor::new(pool),
            service,
            events_rx,
            shutdown_rx,
        }
    }

    /// Run until shutdown is signalled or the channel closes.
    pub async fn run(mut self) {
        info!("ChainEventIngestor started");

        loop {
            tokio::select! {
                biased;

                changed = self.shutdown_rx.changed() => {
                    // Err means the sender is gone; treat it as shutdown
                    // or the biased loop spins forever.
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        info!("ChainEventIngestor shutting down");
                        break;
                    }
                }

                delivery = self.events_rx.recv() => {
                    match delivery {
                        Some(delivery) => {
                            let tx_hash = delivery.tx_hash.clone();
                            if let Err(e) = self.handle_delivery(delivery).await {
                                error!(tx_hash = %tx_hash, error = %e, "Failed to apply chain event");
                            }
                        }
                        None => {
                            info!("Chain event channel closed");
                            break;
                        }
                    }
                }
            }
        }

        info!("ChainEventIngestor shutdown complete");
    }

    async fn handle_delivery(&self, delivery: EventDelivery) -> Result<(), IngestError> {
        let event: MarketplaceEvent = match serde_json::from_value(delivery.event) {
            Ok(event) => event,
            Err(e) => {
                // Not claimed: a corrected redelivery can still apply.
                warn!(
                    chain_id = %delivery.chain_id,
                    tx_hash = %delivery.tx_hash,
                    error = %e,
                    "Discarding undecodable chain event"
                );
                return Ok(());
            }
        };

        let fresh = self
            .processor
            .process(TryMarkEventProcessed {
                tx_hash: delivery.tx_hash.clone(),
            })
            .await?;
        if !fresh {
            debug!(tx_hash = %delivery.tx_hash, "Skipping already-processed chain event");
            return Ok(());
        }

        self.apply(delivery.chain_id, event).await
    }

    async fn apply(&self, chain_id: String, event: MarketplaceEvent) -> Result<(), IngestError> {
        match event {
            MarketplaceEvent::OrdersCancelled { participant, nonces } => {
                self.service
                    .confirm_cancellation(OrderSelector {
                        chain_id,
                        participant,
                        nonces: NonceFilter::In(nonces),
                    })
                    .await?;
            }
            MarketplaceEvent::AllOrdersCancelled {
                participant,
                min_nonce,
            } => {
                self.service
                    .confirm_cancellation(OrderSelector {
                        chain_id,
                        participant,
                        nonces: NonceFilter::Below(min_nonce),
                    })
                    .await?;
            }
            MarketplaceEvent::PositionSold {
                buyer,
                seller,
                nonce,
                token_id,
                collection,
                currency,
                amount,
            } => {
                self.service
                    .settle(Settlement {
                        chain_id,
                        buyer,
                        seller,
                        nonce,
                        token_id,
                        collection,
                        currency,
                        amount,
                    })
                    .await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::ChainEventIngestor;
    use crate::events::chain_event_channel;
    use crate::marketplace::MarketplaceService;
    use sqlx::PgPool;
    use std::sync::Arc;
    use std::time::Duration;
    use tbmkt_sdk::objects::{EventDelivery, MarketplaceEvent};
    use tokio::sync::watch;

    #[tokio::test]
    async fn run_exits_when_the_shutdown_sender_drops() {
        // connect_lazy opens no connection; nothing here touches the
        // database.
        let pool = PgPool::connect_lazy("postgres://localhost/unused").unwrap();
        let service = Arc::new(MarketplaceService::new(pool.clone()));
        let (_events_tx, events_rx) = chain_event_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let ingestor = ChainEventIngestor::new(pool, service, events_rx, shutdown_rx);
        drop(shutdown_tx);

        // Without treating a dropped sender as shutdown, the biased
        // loop spins forever and this times out.
        tokio::time::timeout(Duration::from_secs(1), ingestor.run())
            .await
            .unwrap();
    }

    #[test]
    fn delivery_envelope_decodes_into_an_event() {
        let raw = serde_json::json!({
            "chainId": "sol",
            "txHash": "0xabc",
            "kind": "orders_cancelled",
            "participant": "Alice",
            "nonces": [1, 2, 3]
        });
        let delivery: EventDelivery = serde_json::from_value(raw).unwrap();
        assert_eq!(delivery.tx_hash, "0xabc");
        let event: MarketplaceEvent = serde_json::from_value(delivery.event).unwrap();
        assert!(matches!(
            event,
            MarketplaceEvent::OrdersCancelled { ref nonces, .. } if nonces == &[1, 2, 3]
        ));
    }

    #[test]
    fn missing_fields_fail_to_decode() {
        let raw = serde_json::json!({
            "chainId": "sol",
            "txHash": "0xbeef",
            "kind": "position_sold",
            "buyer": "0xb"
        });
        let delivery: EventDelivery = serde_json::from_value(raw).unwrap();
        assert!(serde_json::from_value::<MarketplaceEvent>(delivery.event).is_err());
    }

    #[test]
    fn unknown_event_kinds_fail_to_decode() {
        let raw = serde_json::json!({
            "chainId": "sol",
            "txHash": "0xdef",
            "kind": "governance_vote"
        });
        let delivery: EventDelivery = serde_json::from_value(raw).unwrap();
        assert!(serde_json::from_value::<MarketplaceEvent>(delivery.event).is_err());
    }
}
