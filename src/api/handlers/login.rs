//! Password login with device-history tracking.
//!
//! The session comes from the Credential Store password grant; the device
//! row is recorded by a spawned task so the login response never waits on
//! IP or geolocation lookups.

use axum::{
    extract::Extension,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::device::{spawn_track_login, GeoClient};
use crate::identity::{IdentityClient, Session};

#[derive(ToSchema, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default, rename = "screenWidth")]
    pub screen_width: Option<u32>,
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued"),
        (status = 400, description = "Missing payload or credentials"),
        (status = 401, description = "Invalid login credentials"),
        (status = 500, description = "Credential Store failure")
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    identity: Extension<Arc<IdentityClient>>,
    geo: Extension<Arc<GeoClient>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    if request.email.trim().is_empty() || request.password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            "Email and password are required".to_string(),
        )
            .into_response();
    }

    let session: Session = match identity
        .password_grant(request.email.trim(), &request.password)
        .await
    {
        Ok(Some(session)) => session,
        Ok(None) => {
            return (
                StatusCode::UNAUTHORIZED,
                "Invalid login credentials".to_string(),
            )
                .into_response();
        }
        Err(err) => {
            error!("Login failed upstream: {err}");
            return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
        }
    };

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    info!(user_id = %session.user.id, "login succeeded");
    spawn_track_login(
        pool.0.clone(),
        geo.0.clone(),
        session.user.id,
        user_agent,
        request.screen_width,
    );

    Json(session).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn request_accepts_camel_case_screen_width() -> Result<()> {
        let request: LoginRequest = serde_json::from_value(serde_json::json!({
            "email": "a@x.com",
            "password": "secret",
            "screenWidth": 414
        }))?;
        assert_eq!(request.screen_width, Some(414));
        Ok(())
    }

    #[test]
    fn screen_width_is_optional() -> Result<()> {
        let request: LoginRequest = serde_json::from_value(serde_json::json!({
            "email": "a@x.com",
            "password": "secret"
        }))?;
        assert_eq!(request.screen_width, None);
        Ok(())
    }
}
