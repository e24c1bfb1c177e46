//! Profile Directory access (the `profiles` table).
//!
//! The directory maps identity ids to public profile fields. The OTP
//! workflow only reads it to resolve an email to an id, and writes it to
//! auto-heal a missing row when the Credential Store knows the address but
//! the directory does not.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

/// Look up a profile id by email, case-insensitively.
pub async fn lookup_profile_id(pool: &PgPool, email: &str) -> Result<Option<Uuid>> {
    let query = "SELECT id FROM profiles WHERE lower(email) = lower($1) LIMIT 1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup profile by email")?;

    Ok(row.map(|row| row.get("id")))
}

/// Create a minimal profile for an identity the directory is missing.
/// Username and display name default to the email local part. `ON CONFLICT
/// DO NOTHING` keeps repeated heals idempotent.
pub async fn insert_minimal_profile(pool: &PgPool, id: Uuid, email: &str) -> Result<()> {
    let handle = email_local_part(email);
    let query = r"
        INSERT INTO profiles (id, username, display_name, email)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (id) DO NOTHING
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .bind(handle)
        .bind(handle)
        .bind(email)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to insert minimal profile")?;

    Ok(())
}

/// Delete a profile row. Account deletion treats this as best-effort.
pub async fn delete_profile(pool: &PgPool, id: Uuid) -> Result<()> {
    let query = "DELETE FROM profiles WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete profile")?;

    Ok(())
}

/// The substring before `@`, used for auto-healed usernames.
#[must_use]
pub fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

#[cfg(test)]
mod tests {
    use super::email_local_part;

    #[test]
    fn local_part_strips_domain() {
        assert_eq!(email_local_part("alice@example.com"), "alice");
    }

    #[test]
    fn local_part_keeps_first_segment_only() {
        assert_eq!(email_local_part("a@b@c"), "a");
    }

    #[test]
    fn local_part_of_bare_string_is_identity() {
        assert_eq!(email_local_part("no-at-sign"), "no-at-sign");
    }
}
