//! Lease-based claims stored in `PostgreSQL`.

use std::time::Duration;

use sqlx::PgPool;
use tracing::instrument;

use super::{Claim, ClaimError, ClaimKey, ClaimRegistry};

/// Claims as rows of the `claims` table.
///
/// A claim is a lease: it is granted when no row exists for the key or the
/// existing row's lease has expired. A worker that dies mid-job therefore
/// blocks the key for at most one lease length. Work that can outlast a
/// lease, such as a catalog walk, calls [`ClaimRegistry::renew`] as it
/// progresses and stops once renewal fails.
#[derive(Debug, Clone)]
pub struct PgClaimRegistry {
    pool: PgPool,
    lease: Duration,
}

impl PgClaimRegistry {
    #[must_use]
    pub const fn new(pool: PgPool, lease: Duration) -> Self {
        Self { pool, lease }
    }
}

impl ClaimRegistry for PgClaimRegistry {
    #[instrument(skip(self), fields(claim = %key))]
    async fn try_acquire(&self, key: ClaimKey) -> Result<Option<Claim>, ClaimError> {
        let claim = Claim::new(key);

        let granted: Option<(uuid::Uuid,)> = sqlx::query_as(
            r"
            INSERT INTO claims (key, holder, acquired_at, expires_at)
            VALUES ($1, $2, now(), now() + make_interval(secs => $3))
            ON CONFLICT (key) DO UPDATE
               SET holder = EXCLUDED.holder,
                   acquired_at = EXCLUDED.acquired_at,
                   expires_at = EXCLUDED.expires_at
             WHERE claims.expires_at < now()
            RETURNING holder
            ",
        )
        .bind(key.to_string())
        .bind(claim.holder)
        .bind(self.lease.as_secs_f64())
        .fetch_optional(&self.pool)
        .await?;

        Ok(granted.map(|_| claim))
    }

    #[instrument(skip(self, claim), fields(claim = %claim.key))]
    async fn release(&self, claim: Claim) -> Result<(), ClaimError> {
        sqlx::query("DELETE FROM claims WHERE key = $1 AND holder = $2")
            .bind(claim.key.to_string())
            .bind(claim.holder)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, claim), fields(claim = %claim.key))]
    async fn renew(&self, claim: &Claim) -> Result<bool, ClaimError> {
        let renewed = sqlx::query(
            r"
            UPDATE claims
               SET expires_at = now() + make_interval(secs => $3)
             WHERE key = $1 AND holder = $2
            ",
        )
        .bind(claim.key.to_string())
        .bind(claim.holder)
        .bind(self.lease.as_secs_f64())
        .execute(&self.pool)
        .await?;

        Ok(renewed.rows_affected() == 1)
    }
}
