use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use time::PrimitiveDateTime;
use uuid::Uuid;

#[derive(Debug, Clone)]
/// Try to take the lease for a periodic job.
///
/// The lease is a row keyed by job name with an expiry; it holds across
/// instances, unlike an in-process flag. Acquisition succeeds when the
/// row is absent or its lease has lapsed. Returns `true` on success.
pub struct TryAcquireJobLease {
    pub job_name: &'static str,
    pub holder: Uuid,
    pub now: PrimitiveDateTime,
    pub expires_at: PrimitiveDateTime,
}

impl Processor<TryAcquireJobLease> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:TryAcquireJobLease")]
    async fn process(&self, lease: TryAcquireJobLease) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO job_leases (job_name, holder, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (job_name) DO UPDATE
                SET holder = EXCLUDED.holder, expires_at = EXCLUDED.expires_at
                WHERE job_leases.expires_at < $4
            "#,
        )
        .bind(lease.job_name)
        .bind(lease.holder)
        .bind(lease.expires_at)
        .bind(lease.now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, Clone)]
/// Give the lease back early by expiring it, but only if this holder
/// still owns it.
pub struct ReleaseJobLease {
    pub job_name: &'static str,
    pub holder: Uuid,
    pub now: PrimitiveDateTime,
}

impl Processor<ReleaseJobLease> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ReleaseJobLease")]
    async fn process(&self, release: ReleaseJobLease) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE job_leases SET expires_at = $3 \
             WHERE job_name = $1 AND holder = $2",
        )
        .bind(release.job_name)
        .bind(release.holder)
        .bind(release.now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
