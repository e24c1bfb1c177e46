//! Device history upserts.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::{debug, warn, Instrument};
use uuid::Uuid;

use super::fingerprint::{classify_browser, classify_device_type, classify_os};
use super::geo::{GeoClient, Location};

/// Spawn device tracking for a successful login. Fire-and-forget: the task
/// owns its error boundary and the login response never waits on it.
pub fn spawn_track_login(
    pool: PgPool,
    geo: Arc<GeoClient>,
    user_id: Uuid,
    user_agent: Option<String>,
    screen_width: Option<u32>,
) {
    tokio::spawn(async move {
        if let Err(err) = track_login(&pool, &geo, user_id, user_agent.as_deref(), screen_width).await
        {
            warn!(user_id = %user_id, "device tracking failed: {err}");
        }
    });
}

/// Derive the fingerprint, resolve IP/location, and upsert the device row.
///
/// # Errors
/// Returns an error when the database write fails; lookups never fail hard.
pub async fn track_login(
    pool: &PgPool,
    geo: &GeoClient,
    user_id: Uuid,
    user_agent: Option<&str>,
    screen_width: Option<u32>,
) -> Result<()> {
    let ua = user_agent.unwrap_or("");
    let device_type = classify_device_type(ua, screen_width);
    let browser = classify_browser(ua);
    let os = classify_os(ua);

    let ip = geo.public_ip().await;
    let location = match ip.as_deref() {
        Some(ip) => geo.location(ip).await,
        None => Location::default(),
    };

    let updated = touch_existing_device(
        pool,
        user_id,
        device_type.as_str(),
        browser,
        os,
        ip.as_deref(),
    )
    .await?;

    if updated {
        debug!(user_id = %user_id, "refreshed existing device row");
        return Ok(());
    }

    insert_device(
        pool,
        user_id,
        device_type.as_str(),
        browser,
        os,
        ip.as_deref(),
        user_agent,
        &location,
    )
    .await
}

/// Refresh `last_login` and bump `login_count` for a matching composite key.
/// Returns false when no row matched.
async fn touch_existing_device(
    pool: &PgPool,
    user_id: Uuid,
    device_type: &str,
    browser: &str,
    os: &str,
    ip_address: Option<&str>,
) -> Result<bool> {
    // IS NOT DISTINCT FROM treats two NULL addresses as the same device.
    let query = r"
        UPDATE user_devices
        SET last_login = NOW(),
            login_count = login_count + 1,
            updated_at = NOW()
        WHERE user_id = $1
          AND device_type = $2
          AND browser = $3
          AND os = $4
          AND ip_address IS NOT DISTINCT FROM $5
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .bind(device_type)
        .bind(browser)
        .bind(os)
        .bind(ip_address)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to update device row")?;

    Ok(row.map(|row| row.get::<Uuid, _>("id")).is_some())
}

#[allow(clippy::too_many_arguments)]
async fn insert_device(
    pool: &PgPool,
    user_id: Uuid,
    device_type: &str,
    browser: &str,
    os: &str,
    ip_address: Option<&str>,
    user_agent: Option<&str>,
    location: &Location,
) -> Result<()> {
    let query = r"
        INSERT INTO user_devices
            (user_id, device_type, browser, os, ip_address, user_agent,
             location_country, location_city, last_login, login_count)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), 1)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(device_type)
        .bind(browser)
        .bind(os)
        .bind(ip_address)
        .bind(user_agent)
        .bind(location.country.as_deref())
        .bind(location.city.as_deref())
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to insert device row")?;

    Ok(())
}
