//! Email-to-identity reconciliation.
//!
//! The Profile Directory and the Credential Store are independently owned
//! and can drift: an identity may exist in the store with no profile row.
//! Resolution makes that drift explicit instead of silently patching it: the
//! result records whether the id came from the directory or from the
//! fallback listing scan, and a fallback hit is logged and healed with a
//! minimal profile row.

use anyhow::Result;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use super::directory::{insert_minimal_profile, lookup_profile_id};
use super::IdentityClient;

/// Where a resolved id came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentitySource {
    /// The Profile Directory had a matching row.
    Directory,
    /// The directory missed; the Credential Store listing matched.
    Fallback,
}

#[derive(Clone, Copy, Debug)]
pub struct ResolvedIdentity {
    pub id: Uuid,
    pub source: IdentitySource,
}

/// Resolve an email to an identity id, directory first, store listing as
/// fallback. A fallback hit auto-heals the missing profile row.
///
/// # Errors
/// Returns an error when either collaborator fails; `Ok(None)` means the
/// email is unknown to both.
pub async fn resolve_identity(
    pool: &PgPool,
    store: &IdentityClient,
    email: &str,
) -> Result<Option<ResolvedIdentity>> {
    if let Some(id) = lookup_profile_id(pool, email).await? {
        return Ok(Some(ResolvedIdentity {
            id,
            source: IdentitySource::Directory,
        }));
    }

    let Some(user) = store.find_user_by_email(email).await? else {
        return Ok(None);
    };

    warn!(
        user_id = %user.id,
        "profile directory missing a row for a known identity; auto-healing"
    );
    insert_minimal_profile(pool, user.id, email).await?;

    Ok(Some(ResolvedIdentity {
        id: user.id,
        source: IdentitySource::Fallback,
    }))
}
