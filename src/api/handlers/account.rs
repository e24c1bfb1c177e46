//! Self-service account deletion.
//!
//! The caller proves ownership with their own bearer token. The profile row
//! goes first and is best-effort; the identity deletion is the operation of
//! record and its failure fails the request.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use super::extract_bearer;
use crate::identity::{directory, IdentityClient};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct DeleteAccountResponse {
    pub success: bool,
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/v1/account/delete",
    responses(
        (status = 200, description = "Account deleted", body = DeleteAccountResponse),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 500, description = "Identity deletion failed")
    ),
    tag = "account"
)]
pub async fn delete_account(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    identity: Extension<Arc<IdentityClient>>,
) -> impl IntoResponse {
    let Some(token) = extract_bearer(&headers) else {
        return (
            StatusCode::UNAUTHORIZED,
            "Missing authorization token".to_string(),
        )
            .into_response();
    };

    let user = match identity.user_from_token(token).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return (StatusCode::UNAUTHORIZED, "Invalid token".to_string()).into_response();
        }
        Err(err) => {
            error!("Token lookup failed: {err}");
            return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
        }
    };

    if let Err(err) = directory::delete_profile(&pool, user.id).await {
        warn!(user_id = %user.id, "profile cleanup failed: {err}");
    }

    if let Err(err) = identity.delete_user(&user.id.to_string()).await {
        error!(user_id = %user.id, "identity deletion failed: {err}");
        return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
    }

    info!(user_id = %user.id, "account deleted");
    Json(DeleteAccountResponse {
        success: true,
        message: "Account deleted".to_string(),
    })
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn response_serializes_plainly() -> Result<()> {
        let value = serde_json::to_value(DeleteAccountResponse {
            success: true,
            message: "Account deleted".to_string(),
        })?;
        assert_eq!(
            value,
            serde_json::json!({"success": true, "message": "Account deleted"})
        );
        Ok(())
    }
}
