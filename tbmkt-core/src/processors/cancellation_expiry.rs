//! CancellationExpiry processor.
//!
//! A cancellation request flags orders PROCESSING_CANCELLATION and
//! waits for the on-chain confirmation event. When the confirming
//! transaction never lands, those orders would stay hidden forever;
//! this processor reverts any request older than the timeout back to
//! ACTIVE so the order is live again.

use crate::entities::job_lease::{ReleaseJobLease, TryAcquireJobLease};
use crate::framework::DatabaseProcessor;
use crate::marketplace::MarketplaceService;
use crate::utils::now_utc;
use kanau::processor::Processor;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};
use uuid::Uuid;

const LEASE_NAME: &str = "pending-cancellation-expiry";

/// Periodic revert of unconfirmed cancellation requests.
pub struct CancellationExpiry {
    processor: DatabaseProcessor,
    service: Arc<MarketplaceService>,
    interval: Duration,
    timeout: time::Duration,
    holder: Uuid,
}

impl CancellationExpiry {
    pub fn new(
        pool: PgPool,
        service: Arc<MarketplaceService>,
        interval: Duration,
        timeout: time::Duration,
    ) -> Self {
        Self {
            processor: DatabaseProcessor::new(pool),
            service,
            interval,
            timeout,
            holder: Uuid::new_v4(),
        }
    }

    /// Run expiry sweeps on the configured interval until shutdown.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            timeout_mins = self.timeout.whole_minutes(),
            "CancellationExpiry started"
        );

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    // Err means the sender is gone; treat it as shutdown
                    // or the biased loop spins forever.
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("CancellationExpiry shutting down");
                        break;
                    }
                }

                _ = tokio::time::sleep(self.interval) => {
                    self.run_once().await;
                }
            }
        }

        info!("CancellationExpiry shutdown complete");
    }

    /// One guarded sweep. Failures are logged; the next interval
    /// retries with a later cutoff, so nothing is lost.
    pub async fn run_once(&self) {
        let now = now_utc();
        let lease = TryAcquireJobLease {
            job_name: LEASE_NAME,
            holder: self.holder,
            now,
            expires_at: now + self.interval,
        };
        match self.processor.process(lease).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("Cancellation expiry lease held elsewhere, skipping sweep");
                return;
            }
            Err(e) => {
                error!(error = %e, "Couldn't acquire cancellation expiry lease");
                return;
            }
        }

        if let Err(e) = self.service.expire_pending_cancellations(self.timeout).await {
            error!(error = %e, "Cancellation expiry sweep failed");
        }

        let release = ReleaseJobLease {
            job_name: LEASE_NAME,
            holder: self.holder,
            now: now_utc(),
        };
        if let Err(e) = self.processor.process(release).await {
            error!(error = %e, "Couldn't release cancellation expiry lease");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_exits_when_the_shutdown_sender_drops() {
        // connect_lazy opens no connection; nothing here touches the
        // database.
        let pool = PgPool::connect_lazy("postgres://localhost/unused").unwrap();
        let service = Arc::new(MarketplaceService::new(pool.clone()));
        let expiry = CancellationExpiry::new(
            pool,
            service,
            Duration::from_secs(3600),
            time::Duration::minutes(30),
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        drop(shutdown_tx);

        // Without treating a dropped sender as shutdown, the biased
        // loop spins forever and this times out.
        tokio::time::timeout(Duration::from_secs(1), expiry.run(shutdown_rx))
            .await
            .unwrap();
    }
}
