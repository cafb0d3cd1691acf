use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;

#[derive(Debug, Clone)]
/// Claim a transaction hash for processing.
///
/// Returns `true` when this call inserted the row, i.e. the caller owns
/// the event and must apply its side effects. `false` means another
/// delivery already claimed it. The claim is written before any side
/// effect, so a crash mid-handling can under-apply but never replays.
pub struct TryMarkEventProcessed {
    pub tx_hash: String,
}

impl Processor<TryMarkEventProcessed> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:TryMarkEventProcessed")]
    async fn process(&self, insert: TryMarkEventProcessed) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO processed_events (tx_hash) VALUES ($1) \
             ON CONFLICT (tx_hash) DO NOTHING",
        )
        .bind(insert.tx_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
