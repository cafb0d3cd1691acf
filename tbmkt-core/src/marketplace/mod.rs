//! The order lifecycle service.
//!
//! `MarketplaceService` is the only writer of order status and
//! staleness. It orchestrates:
//! - order creation (validation, insert, sibling demotion, nonce
//!   watermark advance)
//! - off-chain cancellation requests (ACTIVE → PROCESSING_CANCELLATION)
//! - on-chain cancellation confirmations (→ CANCELLED, then sibling
//!   repromotion)
//! - settlements (sale record + order removal)
//! - the batch staleness audit and the pending-cancellation revert
//!   used by the periodic processors

pub mod validator;

use crate::entities::OrderType;
use crate::entities::order::{
    ApplyStalenessFixes, CancelOrders, DeleteSettledOrder, GetAuditPage,
    GetParticipantOrdersOnPositions, GetParticipantPositionOrders, GetPositionOrders, InsertOrder,
    ListOrders, MarkOrdersPendingCancellation, Order, OrderDraft, OrderFilter, OrderSelector,
    OrderWithPosition, RevertStalePendingCancellations,
};
use crate::entities::participant::{AdvanceNonceWatermark, EnsureParticipant, GetNonceWatermark};
use crate::entities::position::{GetPosition, GetPositionHoldings};
use crate::entities::sale::{InsertSale, ListSales, Sale, SaleFilter, Settlement};
use crate::framework::DatabaseProcessor;
use crate::staleness::{audit_window, group_key, plan_corrections};
use crate::utils::now_utc;
use kanau::processor::Processor;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{error, info, warn};

/// Why a candidate order was refused. Expected, user-facing outcomes;
/// never retried. Each maps to a distinct client-visible code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectionReason {
    #[error("Position does not exist.")]
    PositionNotFound,
    #[error("Cannot bid on a position you already own.")]
    BidOnOwnPosition,
    #[error("You do not own this position.")]
    NotOwner,
    #[error("Position wallet still holds tokens.")]
    PositionNotEmpty,
    #[error("Expiration must be set to a future date.")]
    ExpiryInPast,
    #[error("You have an existing bid of equal or higher value for this position.")]
    InferiorBid,
    #[error("You have an existing listing of equal or lower value for this position.")]
    InferiorListing,
    #[error("You have an existing listing using a different currency for this position.")]
    CurrencyMismatch,
    #[error("Duplicate nonce")]
    DuplicateNonce,
}

impl RejectionReason {
    /// Client-visible numeric code for this rejection.
    pub fn code(self) -> u16 {
        match self {
            RejectionReason::PositionNotFound => 404,
            RejectionReason::ExpiryInPast => 400,
            RejectionReason::DuplicateNonce => 409,
            RejectionReason::BidOnOwnPosition => 420,
            RejectionReason::NotOwner => 421,
            RejectionReason::PositionNotEmpty => 422,
            RejectionReason::InferiorBid => 423,
            RejectionReason::InferiorListing => 424,
            RejectionReason::CurrencyMismatch => 425,
        }
    }
}

/// Errors surfaced by the lifecycle service.
#[derive(Debug, Error)]
pub enum MarketplaceError {
    /// A candidate order failed validation.
    #[error(transparent)]
    Rejected(#[from] RejectionReason),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Orchestrates the order lifecycle against the store.
pub struct MarketplaceService {
    processor: DatabaseProcessor,
}

impl MarketplaceService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            processor: DatabaseProcessor::new(pool),
        }
    }

    /// Validate and persist a candidate order.
    ///
    /// On success the order is ACTIVE, any sibling it supersedes is
    /// stale, and the participant's nonce watermark covers the new
    /// nonce. A reused nonce surfaces as `DuplicateNonce` via the
    /// storage constraint, with no partial effects.
    pub async fn create_order(&self, draft: OrderDraft) -> Result<Order, MarketplaceError> {
        let draft = draft.normalized();
        let now = now_utc();

        let position = self
            .processor
            .process(GetPosition {
                chain_id: draft.chain_id.clone(),
                token_id: draft.token_id,
            })
            .await?;

        // The holdings view is only consulted for listings.
        let holdings = match (&position, draft.order_type) {
            (Some(position), OrderType::Listing) => {
                self.processor
                    .process(GetPositionHoldings {
                        chain_id: draft.chain_id.clone(),
                        wallet_address: position.wallet_address.clone(),
                    })
                    .await?
            }
            _ => Vec::new(),
        };

        let existing = self
            .processor
            .process(GetParticipantPositionOrders {
                chain_id: draft.chain_id.clone(),
                participant: draft.participant.clone(),
                token_id: draft.token_id,
                now,
            })
            .await?;

        validator::validate(&draft, position.as_ref(), &holdings, &existing, now)?;

        self.processor
            .process(EnsureParticipant {
                chain_id: draft.chain_id.clone(),
                address: draft.participant.clone(),
            })
            .await?;

        let nonce = draft.nonce;
        let order = match self.processor.process(InsertOrder { draft }).await {
            Ok(order) => order,
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                return Err(RejectionReason::DuplicateNonce.into());
            }
            Err(e) => return Err(e.into()),
        };
        info!(
            order_id = order.id,
            chain_id = %order.chain_id,
            token_id = order.token_id,
            participant = %order.participant,
            nonce = order.nonce,
            "Created order"
        );

        // Re-resolve the affected group. Validation guarantees the new
        // order wins it, which demotes any previously live sibling.
        let mut group: Vec<Order> = existing
            .into_iter()
            .filter(|sibling| group_key(sibling) == group_key(&order))
            .collect();
        group.push(order.clone());
        let fixes = plan_corrections(&group);
        if !fixes.is_empty() {
            self.processor.process(ApplyStalenessFixes { fixes }).await?;
        }

        self.processor
            .process(AdvanceNonceWatermark {
                chain_id: order.chain_id.clone(),
                address: order.participant.clone(),
                nonce,
            })
            .await?;

        Ok(order)
    }

    /// Flag matching ACTIVE orders as cancellation-in-flight.
    /// Idempotent: orders already in flight are untouched.
    pub async fn request_cancellation(
        &self,
        selector: OrderSelector,
    ) -> Result<u64, MarketplaceError> {
        let selector = selector.normalized();
        let updated = self
            .processor
            .process(MarkOrdersPendingCancellation {
                selector: selector.clone(),
                now: now_utc(),
            })
            .await?;
        info!(
            chain_id = %selector.chain_id,
            participant = %selector.participant,
            updated,
            "Marked orders as processing cancellation"
        );
        Ok(updated)
    }

    /// Apply a confirmed on-chain cancellation, then promote the best
    /// surviving sibling in every group that lost its live member.
    pub async fn confirm_cancellation(
        &self,
        selector: OrderSelector,
    ) -> Result<(), MarketplaceError> {
        let selector = selector.normalized();
        let mut token_ids = self
            .processor
            .process(CancelOrders {
                selector: selector.clone(),
            })
            .await?;
        info!(
            chain_id = %selector.chain_id,
            participant = %selector.participant,
            cancelled = token_ids.len(),
            "Cancelled orders"
        );
        if token_ids.is_empty() {
            return Ok(());
        }
        token_ids.sort_unstable();
        token_ids.dedup();

        // The periodic audit is the authoritative backstop for missed
        // repromotions, so a failure here must not fail the event.
        if let Err(e) = self.repromote_siblings(&selector, token_ids).await {
            error!(error = %e, "Couldn't repromote sibling orders");
        }
        Ok(())
    }

    async fn repromote_siblings(
        &self,
        selector: &OrderSelector,
        token_ids: Vec<i64>,
    ) -> Result<(), MarketplaceError> {
        let survivors = self
            .processor
            .process(GetParticipantOrdersOnPositions {
                chain_id: selector.chain_id.clone(),
                participant: selector.participant.clone(),
                token_ids,
                now: now_utc(),
            })
            .await?;
        let fixes = plan_corrections(&survivors);
        if !fixes.is_empty() {
            self.processor.process(ApplyStalenessFixes { fixes }).await?;
        }
        Ok(())
    }

    /// Record a confirmed trade and remove the order it consumed.
    pub async fn settle(&self, settlement: Settlement) -> Result<(), MarketplaceError> {
        let settlement = settlement.normalized();
        info!(
            chain_id = %settlement.chain_id,
            token_id = settlement.token_id,
            nonce = settlement.nonce,
            "Settling order"
        );
        self.processor
            .process(InsertSale {
                settlement: settlement.clone(),
                date: now_utc(),
            })
            .await?;
        let deleted = self
            .processor
            .process(DeleteSettledOrder {
                chain_id: settlement.chain_id,
                buyer: settlement.buyer,
                seller: settlement.seller,
                nonce: settlement.nonce,
                token_id: settlement.token_id,
                collection: settlement.collection,
            })
            .await?;
        if deleted == 0 {
            warn!("Settlement event matched no stored order");
        }
        Ok(())
    }

    /// Read path: non-stale, non-expired orders matching the filter.
    pub async fn list_orders(
        &self,
        filter: OrderFilter,
    ) -> Result<Vec<OrderWithPosition>, MarketplaceError> {
        Ok(self
            .processor
            .process(ListOrders {
                filter,
                now: now_utc(),
            })
            .await?)
    }

    /// Read path: settled trades matching the filter, newest first.
    pub async fn list_sales(&self, filter: SaleFilter) -> Result<Vec<Sale>, MarketplaceError> {
        Ok(self.processor.process(ListSales { filter }).await?)
    }

    /// A participant's current nonce watermark.
    pub async fn nonce_watermark(
        &self,
        chain_id: &str,
        address: &str,
    ) -> Result<i64, MarketplaceError> {
        Ok(self
            .processor
            .process(GetNonceWatermark {
                chain_id: chain_id.to_lowercase(),
                address: address.to_lowercase(),
            })
            .await?)
    }

    /// Revert cancellations that never confirmed within the timeout.
    pub async fn expire_pending_cancellations(
        &self,
        timeout: time::Duration,
    ) -> Result<u64, MarketplaceError> {
        let reverted = self
            .processor
            .process(RevertStalePendingCancellations {
                cutoff: now_utc() - timeout,
            })
            .await?;
        if reverted > 0 {
            info!(reverted, "Reverted unconfirmed pending cancellations to ACTIVE");
        }
        Ok(reverted)
    }

    /// One full audit pass over a chain: re-derive staleness for every
    /// non-cancelled, non-expired order and write back only the rows
    /// that differ. Pages never split a competition group. Returns the
    /// number of corrected rows.
    pub async fn audit_chain_staleness(
        &self,
        chain_id: &str,
        batch_size: i64,
    ) -> Result<u64, MarketplaceError> {
        let chain_id = chain_id.to_lowercase();
        let batch_size = batch_size.max(2);
        let mut cursor = 0i64;
        let mut corrected = 0u64;

        loop {
            let rows = self
                .processor
                .process(GetAuditPage {
                    chain_id: chain_id.clone(),
                    min_token_id: cursor,
                    now: now_utc(),
                    limit: batch_size,
                })
                .await?;
            let window = audit_window(rows, batch_size as usize);

            let mut fixes = plan_corrections(&window.resolved);
            if let Some(token_id) = window.spill {
                // The position overflowed the page; its truncated slice
                // must not be resolved, or a second winner could go
                // live alongside one past the page boundary.
                let group = self
                    .processor
                    .process(GetPositionOrders {
                        chain_id: chain_id.clone(),
                        token_id,
                        now: now_utc(),
                    })
                    .await?;
                fixes.extend(plan_corrections(&group));
            }
            if !fixes.is_empty() {
                info!(
                    chain_id = %chain_id,
                    corrections = fixes.len(),
                    "Correcting orders with drifted staleness"
                );
                corrected += self.processor.process(ApplyStalenessFixes { fixes }).await?;
            }

            match window.next_cursor {
                Some(next) => cursor = next,
                None => break,
            }
        }
        Ok(corrected)
    }
}
