//! The one-time-code ledger (`verification_codes` table).
//!
//! Invariant: at most one active code per email. Issuing deletes every
//! existing row for the address before inserting the new one, so the last
//! sender wins. Consumption is a conditional compare-and-delete keyed by
//! email+code+unexpired, so two concurrent attempts with the same code
//! cannot both succeed.

use anyhow::{Context, Result};
use rand::Rng;
use sqlx::PgPool;
use tracing::Instrument;

/// Codes stay valid for 10 minutes.
pub const CODE_TTL_SECONDS: i64 = 600;

/// Outcome of a consumption attempt. Expiry is only reported for a code
/// that actually matched; a wrong code and a missing code are
/// indistinguishable to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Consumed,
    Expired,
    Missing,
}

/// Uniformly random 6-digit decimal code.
#[must_use]
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

/// Replace any outstanding code for the email with a fresh one.
pub async fn issue_code(pool: &PgPool, email: &str, code: &str) -> Result<()> {
    let mut tx = pool.begin().await.context("begin issue-code transaction")?;

    let query = "DELETE FROM verification_codes WHERE lower(email) = lower($1)";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to delete outstanding codes")?;

    let query = r"
        INSERT INTO verification_codes (email, code, expires_at)
        VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .bind(code)
        .bind(CODE_TTL_SECONDS)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to insert verification code")?;

    tx.commit().await.context("commit issue-code transaction")?;

    Ok(())
}

/// Atomically consume a matching, unexpired code, then clear any other rows
/// for the email so a stale duplicate cannot be replayed. When nothing was
/// consumed, classify the failure: a matching-but-expired row reports
/// `Expired`, anything else reports `Missing`.
pub async fn consume_code(pool: &PgPool, email: &str, code: &str) -> Result<ConsumeOutcome> {
    let query = r"
        DELETE FROM verification_codes
        WHERE lower(email) = lower($1)
          AND code = $2
          AND expires_at > NOW()
        RETURNING email
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let consumed = sqlx::query(query)
        .bind(email)
        .bind(code)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to consume verification code")?;

    if consumed.is_some() {
        purge_codes(pool, email).await?;
        return Ok(ConsumeOutcome::Consumed);
    }

    // Read-only classification; the expired row stays until superseded.
    let query = r"
        SELECT 1 AS present
        FROM verification_codes
        WHERE lower(email) = lower($1)
          AND code = $2
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let expired_row = sqlx::query(query)
        .bind(email)
        .bind(code)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to classify verification code")?;

    if expired_row.is_some() {
        Ok(ConsumeOutcome::Expired)
    } else {
        Ok(ConsumeOutcome::Missing)
    }
}

/// Delete every code for the email, matched or not.
pub async fn purge_codes(pool: &PgPool, email: &str) -> Result<()> {
    let query = "DELETE FROM verification_codes WHERE lower(email) = lower($1)";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to purge verification codes")?;

    Ok(())
}
