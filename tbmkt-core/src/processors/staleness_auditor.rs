//! StalenessAuditor processor.
//!
//! The auditor is the convergence backstop for the `is_stale` flag: the
//! event-driven paths keep it current in the common case, and the
//! auditor repairs whatever they miss (crashes between writes, races,
//! expiries flipping a group's winner). Each pass walks every
//! non-cancelled, non-expired order of a chain in position order and
//! writes back only the rows whose recomputed flag differs.

use crate::entities::job_lease::{ReleaseJobLease, TryAcquireJobLease};
use crate::framework::DatabaseProcessor;
use crate::marketplace::MarketplaceService;
use crate::utils::now_utc;
use crate::utils::retry::retry_with_backoff;
use kanau::processor::Processor;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};
use uuid::Uuid;

const LEASE_NAME: &str = "staleness-audit";
const MAX_ATTEMPTS_PER_CHAIN: u32 = 3;

/// Periodic whole-chain staleness audit.
pub struct StalenessAuditor {
    processor: DatabaseProcessor,
    service: Arc<MarketplaceService>,
    chains: Vec<String>,
    interval: Duration,
    batch_size: i64,
    holder: Uuid,
}

impl StalenessAuditor {
    pub fn new(
        pool: PgPool,
        service: Arc<MarketplaceService>,
        chains: Vec<String>,
        interval: Duration,
        batch_size: i64,
    ) -> Self {
        Self {
            processor: DatabaseProcessor::new(pool),
            service,
            chains,
            interval,
            batch_size,
            holder: Uuid::new_v4(),
        }
    }

    /// Run audit passes on the configured interval until shutdown.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            chains = self.chains.len(),
            interval_secs = self.interval.as_secs(),
            "StalenessAuditor started"
        );

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    // Err means the sender is gone; treat it as shutdown
                    // or the biased loop spins forever.
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("StalenessAuditor shutting down");
                        break;
                    }
                }

                _ = tokio::time::sleep(self.interval) => {
                    self.run_once().await;
                }
            }
        }

        info!("StalenessAuditor shutdown complete");
    }

    /// One guarded audit pass over every configured chain.
    ///
    /// A failing chain is logged and does not stop the pass; the other
    /// chains still get audited and the next interval retries.
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
                debug!("Staleness audit lease held elsewhere, skipping pass");
                return;
            }
            Err(e) => {
                error!(error = %e, "Couldn't acquire staleness audit lease");
                return;
            }
        }

        for chain_id in &self.chains {
            let outcome = retry_with_backoff(MAX_ATTEMPTS_PER_CHAIN, "staleness audit", || {
                self.service
                    .audit_chain_staleness(chain_id, self.batch_size)
            })
            .await;
            match outcome {
                Ok(corrected) => {
                    info!(chain_id = %chain_id, corrected, "Staleness audit pass complete");
                }
                Err(e) => {
                    error!(chain_id = %chain_id, error = %e, "Staleness audit pass failed");
                }
            }
        }

        let release = ReleaseJobLease {
            job_name: LEASE_NAME,
            holder: self.holder,
            now: now_utc(),
        };
        if let Err(e) = self.processor.process(release).await {
            // The lease will lapse on its own at expires_at.
            error!(error = %e, "Couldn't release staleness audit lease");
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
        let auditor = StalenessAuditor::new(
            pool,
            service,
            vec!["solana".to_owned()],
            Duration::from_secs(3600),
            10,
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        drop(shutdown_tx);

        // Without treating a dropped sender as shutdown, the biased
        // loop spins forever and this times out.
        tokio::time::timeout(Duration::from_secs(1), auditor.run(shutdown_rx))
            .await
            .unwrap();
    }
}
