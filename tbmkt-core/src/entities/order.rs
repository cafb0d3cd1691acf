use crate::entities::{OrderStatus, OrderType};
use crate::framework::DatabaseProcessor;
use crate::staleness::StalenessFix;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder};
use tbmkt_sdk::objects::{CancellationRequest, CancellationTarget};
use time::PrimitiveDateTime;

/// A stored order. Core fields are immutable after creation; only the
/// lifecycle service mutates `status`, `is_stale` and
/// `pending_cancellation_date`.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Order {
    pub id: i64,
    pub order_type: OrderType,
    pub collection: String,
    pub currency: String,
    pub participant: String,
    pub chain_id: String,
    pub token_id: i64,
    pub amount: Decimal,
    pub nonce: i64,
    pub expiry: PrimitiveDateTime,
    pub signature: String,
    pub status: OrderStatus,
    pub is_stale: bool,
    pub pending_cancellation_date: Option<PrimitiveDateTime>,
    pub created_at: PrimitiveDateTime,
}

/// A validated candidate order, ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub order_type: OrderType,
    pub collection: String,
    pub currency: String,
    pub participant: String,
    pub chain_id: String,
    pub token_id: i64,
    pub amount: Decimal,
    pub nonce: i64,
    pub expiry: PrimitiveDateTime,
    pub signature: String,
}

impl OrderDraft {
    /// Canonical form: addresses, currency, collection and chain id are
    /// stored lower-cased so lookups never depend on caller casing.
    pub fn normalized(mut self) -> Self {
        self.collection = self.collection.to_lowercase();
        self.currency = self.currency.to_lowercase();
        self.participant = self.participant.to_lowercase();
        self.chain_id = self.chain_id.to_lowercase();
        self
    }
}

/// Which nonces of a participant an operation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NonceFilter {
    /// An explicit nonce set.
    In(Vec<i64>),
    /// Every nonce strictly below the threshold.
    Below(i64),
}

/// Targets orders of one participant on one chain, by nonce.
///
/// The same selector semantics drive off-chain cancellation requests
/// and on-chain cancellation confirmations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSelector {
    pub chain_id: String,
    pub participant: String,
    pub nonces: NonceFilter,
}

impl OrderSelector {
    pub fn normalized(mut self) -> Self {
        self.chain_id = self.chain_id.to_lowercase();
        self.participant = self.participant.to_lowercase();
        self
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" chain_id = ");
        qb.push_bind(self.chain_id.clone());
        qb.push(" AND participant = ");
        qb.push_bind(self.participant.clone());
        match &self.nonces {
            NonceFilter::In(nonces) => {
                qb.push(" AND nonce = ANY(");
                qb.push_bind(nonces.clone());
                qb.push(")");
            }
            NonceFilter::Below(min_nonce) => {
                qb.push(" AND nonce < ");
                qb.push_bind(*min_nonce);
            }
        }
    }
}

impl From<CancellationRequest> for OrderSelector {
    fn from(req: CancellationRequest) -> Self {
        let nonces = match req.target {
            CancellationTarget::Nonces { nonces } => NonceFilter::In(nonces),
            CancellationTarget::BelowNonce { below_nonce } => NonceFilter::Below(below_nonce),
        };
        OrderSelector {
            chain_id: req.chain_id,
            participant: req.participant,
            nonces,
        }
        .normalized()
    }
}

/// An order joined with its position row, for the read path.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderWithPosition {
    #[sqlx(flatten)]
    pub order: Order,
    pub wallet_address: String,
    pub owner_address: String,
}

/// Filters for the order read path. Stale and expired orders are
/// always excluded; cancelled orders are excluded unless an explicit
/// status filter asks for them.
#[derive(Debug, Clone)]
pub struct OrderFilter {
    pub chain_id: Option<String>,
    pub collection: Option<String>,
    pub currency: Option<String>,
    pub participant: Option<String>,
    pub token_id: Option<i64>,
    pub order_type: Option<OrderType>,
    pub status: Option<OrderStatus>,
    pub owner_address: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for OrderFilter {
    fn default() -> Self {
        Self {
            chain_id: None,
            collection: None,
            currency: None,
            participant: None,
            token_id: None,
            order_type: None,
            status: None,
            owner_address: None,
            limit: 100,
            offset: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
/// Insert a new ACTIVE order.
///
/// The `(chain_id, participant, nonce)` uniqueness constraint makes a
/// duplicate nonce surface as a database error with no partial effects;
/// the caller maps it to a rejection.
pub struct InsertOrder {
    pub draft: OrderDraft,
}

impl Processor<InsertOrder> for DatabaseProcessor {
    type Output = Order;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertOrder")]
    async fn process(&self, insert: InsertOrder) -> Result<Order, sqlx::Error> {
        let d = insert.draft;
        sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders
                (order_type, collection, currency, participant, chain_id,
                 token_id, amount, nonce, expiry, signature)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(d.order_type)
        .bind(d.collection)
        .bind(d.currency)
        .bind(d.participant)
        .bind(d.chain_id)
        .bind(d.token_id)
        .bind(d.amount)
        .bind(d.nonce)
        .bind(d.expiry)
        .bind(d.signature)
        .fetch_one(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// All of a participant's live-competing orders on one position:
/// ACTIVE or PROCESSING_CANCELLATION, not yet expired, stale included.
pub struct GetParticipantPositionOrders {
    pub chain_id: String,
    pub participant: String,
    pub token_id: i64,
    pub now: PrimitiveDateTime,
}

impl Processor<GetParticipantPositionOrders> for DatabaseProcessor {
    type Output = Vec<Order>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetParticipantPositionOrders")]
    async fn process(&self, query: GetParticipantPositionOrders) -> Result<Vec<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            r#"
            SELECT * FROM orders
            WHERE chain_id = $1 AND participant = $2 AND token_id = $3
              AND status <> $4 AND expiry > $5
            "#,
        )
        .bind(query.chain_id)
        .bind(query.participant)
        .bind(query.token_id)
        .bind(OrderStatus::Cancelled)
        .bind(query.now)
        .fetch_all(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// A participant's surviving competing orders across a set of
/// positions, used to repromote siblings after a cancellation.
pub struct GetParticipantOrdersOnPositions {
    pub chain_id: String,
    pub participant: String,
    pub token_ids: Vec<i64>,
    pub now: PrimitiveDateTime,
}

impl Processor<GetParticipantOrdersOnPositions> for DatabaseProcessor {
    type Output = Vec<Order>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetParticipantOrdersOnPositions")]
    async fn process(
        &self,
        query: GetParticipantOrdersOnPositions,
    ) -> Result<Vec<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            r#"
            SELECT * FROM orders
            WHERE chain_id = $1 AND participant = $2 AND token_id = ANY($3)
              AND status <> $4 AND expiry > $5
            "#,
        )
        .bind(query.chain_id)
        .bind(query.participant)
        .bind(query.token_ids)
        .bind(OrderStatus::Cancelled)
        .bind(query.now)
        .fetch_all(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Move matching ACTIVE orders to PROCESSING_CANCELLATION.
///
/// Orders already processing are left untouched, which makes the
/// request idempotent. Returns the number of rows moved.
pub struct MarkOrdersPendingCancellation {
    pub selector: OrderSelector,
    pub now: PrimitiveDateTime,
}

impl Processor<MarkOrdersPendingCancellation> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:MarkOrdersPendingCancellation")]
    async fn process(&self, update: MarkOrdersPendingCancellation) -> Result<u64, sqlx::Error> {
        let mut qb = QueryBuilder::new("UPDATE orders SET status = ");
        qb.push_bind(OrderStatus::ProcessingCancellation);
        qb.push(", pending_cancellation_date = ");
        qb.push_bind(update.now);
        qb.push(" WHERE status = ");
        qb.push_bind(OrderStatus::Active);
        qb.push(" AND");
        update.selector.push_where(&mut qb);
        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone)]
/// Mark matching orders CANCELLED, from either ACTIVE or
/// PROCESSING_CANCELLATION. Returns the token ids of the cancelled
/// rows so their groups can be re-resolved.
pub struct CancelOrders {
    pub selector: OrderSelector,
}

impl Processor<CancelOrders> for DatabaseProcessor {
    type Output = Vec<i64>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:CancelOrders")]
    async fn process(&self, update: CancelOrders) -> Result<Vec<i64>, sqlx::Error> {
        let mut qb = QueryBuilder::new("UPDATE orders SET status = ");
        qb.push_bind(OrderStatus::Cancelled);
        qb.push(" WHERE status <> ");
        qb.push_bind(OrderStatus::Cancelled);
        qb.push(" AND");
        update.selector.push_where(&mut qb);
        qb.push(" RETURNING token_id");
        let rows: Vec<(i64,)> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(token_id,)| token_id).collect())
    }
}

#[derive(Debug, Clone)]
/// Apply a staleness plan as set-based updates, one per direction.
/// Safe to re-apply; every row's target value is absolute, not
/// relative, so a partially applied batch converges on retry.
pub struct ApplyStalenessFixes {
    pub fixes: Vec<StalenessFix>,
}

impl Processor<ApplyStalenessFixes> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ApplyStalenessFixes")]
    async fn process(&self, update: ApplyStalenessFixes) -> Result<u64, sqlx::Error> {
        let (stale, live): (Vec<i64>, Vec<i64>) = {
            let mut stale = Vec::new();
            let mut live = Vec::new();
            for fix in &update.fixes {
                if fix.is_stale {
                    stale.push(fix.id);
                } else {
                    live.push(fix.id);
                }
            }
            (stale, live)
        };

        let mut affected = 0;
        if !stale.is_empty() {
            affected += sqlx::query("UPDATE orders SET is_stale = TRUE WHERE id = ANY($1)")
                .bind(stale)
                .execute(&self.pool)
                .await?
                .rows_affected();
        }
        if !live.is_empty() {
            affected += sqlx::query("UPDATE orders SET is_stale = FALSE WHERE id = ANY($1)")
                .bind(live)
                .execute(&self.pool)
                .await?
                .rows_affected();
        }
        Ok(affected)
    }
}

#[derive(Debug, Clone)]
/// Remove the order consumed by a settlement. The trade identifies it
/// by chain, either trade party, nonce, token id and collection.
pub struct DeleteSettledOrder {
    pub chain_id: String,
    pub buyer: String,
    pub seller: String,
    pub nonce: i64,
    pub token_id: i64,
    pub collection: String,
}

impl Processor<DeleteSettledOrder> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:DeleteSettledOrder")]
    async fn process(&self, delete: DeleteSettledOrder) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM orders
            WHERE chain_id = $1 AND participant = ANY($2) AND nonce = $3
              AND token_id = $4 AND collection = $5
            "#,
        )
        .bind(delete.chain_id)
        .bind(vec![delete.buyer, delete.seller])
        .bind(delete.nonce)
        .bind(delete.token_id)
        .bind(delete.collection)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone)]
/// One page of the staleness audit scan: non-cancelled, non-expired
/// orders of a chain from `min_token_id` upward, in the exact order
/// the grouping pass expects.
pub struct GetAuditPage {
    pub chain_id: String,
    pub min_token_id: i64,
    pub now: PrimitiveDateTime,
    pub limit: i64,
}

impl Processor<GetAuditPage> for DatabaseProcessor {
    type Output = Vec<Order>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetAuditPage")]
    async fn process(&self, query: GetAuditPage) -> Result<Vec<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            r#"
            SELECT * FROM orders
            WHERE chain_id = $1 AND status <> $2
              AND token_id >= $3 AND expiry > $4
            ORDER BY token_id, participant, currency
            LIMIT $5
            "#,
        )
        .bind(query.chain_id)
        .bind(OrderStatus::Cancelled)
        .bind(query.min_token_id)
        .bind(query.now)
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Every non-cancelled, non-expired order on one position, across all
/// participants. Used when a position's orders overflow an audit page
/// and must be resolved as a whole.
pub struct GetPositionOrders {
    pub chain_id: String,
    pub token_id: i64,
    pub now: PrimitiveDateTime,
}

impl Processor<GetPositionOrders> for DatabaseProcessor {
    type Output = Vec<Order>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetPositionOrders")]
    async fn process(&self, query: GetPositionOrders) -> Result<Vec<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            r#"
            SELECT * FROM orders
            WHERE chain_id = $1 AND status <> $2
              AND token_id = $3 AND expiry > $4
            "#,
        )
        .bind(query.chain_id)
        .bind(OrderStatus::Cancelled)
        .bind(query.token_id)
        .bind(query.now)
        .fetch_all(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Revert stuck cancellations: PROCESSING_CANCELLATION rows whose
/// request predates the cutoff go back to ACTIVE with the pending
/// date cleared.
pub struct RevertStalePendingCancellations {
    pub cutoff: PrimitiveDateTime,
}

impl Processor<RevertStalePendingCancellations> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:RevertStalePendingCancellations")]
    async fn process(&self, update: RevertStalePendingCancellations) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $1, pending_cancellation_date = NULL
            WHERE status = $2 AND pending_cancellation_date < $3
            "#,
        )
        .bind(OrderStatus::Active)
        .bind(OrderStatus::ProcessingCancellation)
        .bind(update.cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone)]
/// Filtered, paginated order listing joined with position rows,
/// newest first.
pub struct ListOrders {
    pub filter: OrderFilter,
    pub now: PrimitiveDateTime,
}

impl Processor<ListOrders> for DatabaseProcessor {
    type Output = Vec<OrderWithPosition>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListOrders")]
    async fn process(&self, query: ListOrders) -> Result<Vec<OrderWithPosition>, sqlx::Error> {
        let f = query.filter;
        let mut qb = QueryBuilder::new(
            "SELECT o.*, p.wallet_address, p.owner_address \
             FROM orders o \
             JOIN positions p ON p.chain_id = o.chain_id AND p.token_id = o.token_id \
             WHERE o.is_stale = FALSE AND o.expiry > ",
        );
        qb.push_bind(query.now);
        match f.status {
            Some(status) => {
                qb.push(" AND o.status = ");
                qb.push_bind(status);
            }
            None => {
                qb.push(" AND o.status <> ");
                qb.push_bind(OrderStatus::Cancelled);
            }
        }
        if let Some(chain_id) = f.chain_id {
            qb.push(" AND o.chain_id = ");
            qb.push_bind(chain_id.to_lowercase());
        }
        if let Some(collection) = f.collection {
            qb.push(" AND o.collection = ");
            qb.push_bind(collection.to_lowercase());
        }
        if let Some(currency) = f.currency {
            qb.push(" AND o.currency = ");
            qb.push_bind(currency.to_lowercase());
        }
        if let Some(participant) = f.participant {
            qb.push(" AND o.participant = ");
            qb.push_bind(participant.to_lowercase());
        }
        if let Some(token_id) = f.token_id {
            qb.push(" AND o.token_id = ");
            qb.push_bind(token_id);
        }
        if let Some(order_type) = f.order_type {
            qb.push(" AND o.order_type = ");
            qb.push_bind(order_type);
        }
        if let Some(owner) = f.owner_address {
            qb.push(" AND p.owner_address = ");
            qb.push_bind(owner.to_lowercase());
        }
        qb.push(" ORDER BY o.created_at DESC LIMIT ");
        qb.push_bind(f.limit.clamp(1, 1000));
        qb.push(" OFFSET ");
        qb.push_bind(f.offset.max(0));

        qb.build_query_as::<OrderWithPosition>()
            .fetch_all(&self.pool)
            .await
    }
}
