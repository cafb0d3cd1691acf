use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;

#[derive(Debug, Clone)]
/// Make sure the participant row exists before orders reference it.
pub struct EnsureParticipant {
    pub chain_id: String,
    pub address: String,
}

impl Processor<EnsureParticipant> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:EnsureParticipant")]
    async fn process(&self, insert: EnsureParticipant) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO participants (chain_id, address) VALUES ($1, $2) \
             ON CONFLICT (chain_id, address) DO NOTHING",
        )
        .bind(insert.chain_id)
        .bind(insert.address)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Read the participant's nonce watermark; 0 when unknown.
pub struct GetNonceWatermark {
    pub chain_id: String,
    pub address: String,
}

impl Processor<GetNonceWatermark> for DatabaseProcessor {
    type Output = i64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetNonceWatermark")]
    async fn process(&self, query: GetNonceWatermark) -> Result<i64, sqlx::Error> {
        let nonce: Option<i64> = sqlx::query_scalar(
            "SELECT nonce FROM participants WHERE chain_id = $1 AND address = $2",
        )
        .bind(query.chain_id)
        .bind(query.address)
        .fetch_optional(&self.pool)
        .await?;
        Ok(nonce.unwrap_or(0))
    }
}

#[derive(Debug, Clone)]
/// Raise the watermark to `nonce` if it is higher than the stored
/// value. The watermark never moves backward.
pub struct AdvanceNonceWatermark {
    pub chain_id: String,
    pub address: String,
    pub nonce: i64,
}

impl Processor<AdvanceNonceWatermark> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:AdvanceNonceWatermark")]
    async fn process(&self, update: AdvanceNonceWatermark) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO participants (chain_id, address, nonce) VALUES ($1, $2, $3) \
             ON CONFLICT (chain_id, address) \
             DO UPDATE SET nonce = GREATEST(participants.nonce, EXCLUDED.nonce)",
        )
        .bind(update.chain_id)
        .bind(update.address)
        .bind(update.nonce)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
