use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use rust_decimal::Decimal;

/// A tradable wallet-bound position: the NFT index plus the wallet the
/// token binds and its current owner.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Position {
    pub chain_id: String,
    pub token_id: i64,
    pub wallet_address: String,
    pub owner_address: String,
}

/// A token balance held inside a position's bound wallet.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct TokenHolding {
    pub token_address: String,
    pub balance: Decimal,
}

#[derive(Debug, Clone)]
/// Look up a position in the registry.
pub struct GetPosition {
    pub chain_id: String,
    pub token_id: i64,
}

impl Processor<GetPosition> for DatabaseProcessor {
    type Output = Option<Position>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetPosition")]
    async fn process(&self, query: GetPosition) -> Result<Option<Position>, sqlx::Error> {
        sqlx::query_as::<_, Position>(
            "SELECT chain_id, token_id, wallet_address, owner_address \
             FROM positions WHERE chain_id = $1 AND token_id = $2",
        )
        .bind(query.chain_id)
        .bind(query.token_id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Current holdings view of a bound wallet. May lag the chain; the
/// listing-must-be-empty rule treats it as best effort.
pub struct GetPositionHoldings {
    pub chain_id: String,
    pub wallet_address: String,
}

impl Processor<GetPositionHoldings> for DatabaseProcessor {
    type Output = Vec<TokenHolding>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetPositionHoldings")]
    async fn process(&self, query: GetPositionHoldings) -> Result<Vec<TokenHolding>, sqlx::Error> {
        sqlx::query_as::<_, TokenHolding>(
            "SELECT token_address, balance FROM position_holdings \
             WHERE chain_id = $1 AND wallet_address = $2",
        )
        .bind(query.chain_id)
        .bind(query.wallet_address)
        .fetch_all(&self.pool)
        .await
    }
}
