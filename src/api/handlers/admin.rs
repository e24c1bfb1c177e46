//! Bulk user deletion for back-office tooling.
//!
//! Each id is attempted independently against the Credential Store and
//! reported individually; the request only fails wholesale when every
//! deletion failed.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::identity::IdentityClient;

#[derive(ToSchema, Deserialize, Debug)]
pub struct DeleteUsersRequest {
    #[serde(rename = "userIds")]
    pub user_ids: Vec<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct DeletionResult {
    pub id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct DeleteUsersResponse {
    pub message: String,
    pub results: Vec<DeletionResult>,
}

#[utoipa::path(
    post,
    path = "/v1/admin/users/delete",
    request_body = DeleteUsersRequest,
    responses(
        (status = 200, description = "Per-id deletion results", body = DeleteUsersResponse),
        (status = 400, description = "Missing payload or empty id list"),
        (status = 500, description = "Every deletion failed", body = DeleteUsersResponse)
    ),
    tag = "admin"
)]
pub async fn delete_users(
    identity: Extension<Arc<IdentityClient>>,
    payload: Option<Json<DeleteUsersRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    if request.user_ids.is_empty() {
        return (StatusCode::BAD_REQUEST, "userIds is required".to_string()).into_response();
    }

    let mut results = Vec::with_capacity(request.user_ids.len());
    let mut deleted = 0usize;

    for id in &request.user_ids {
        match identity.delete_user(id).await {
            Ok(()) => {
                deleted += 1;
                results.push(DeletionResult {
                    id: id.clone(),
                    status: "success".to_string(),
                    error: None,
                });
            }
            Err(err) => {
                error!(user_id = %id, "deletion failed: {err}");
                results.push(DeletionResult {
                    id: id.clone(),
                    status: "failed".to_string(),
                    error: Some(err.to_string()),
                });
            }
        }
    }

    info!(
        deleted,
        failed = results.len() - deleted,
        "bulk deletion finished"
    );

    let status = if deleted == 0 {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    let response = DeleteUsersResponse {
        message: format!("Deleted {deleted} of {} users", results.len()),
        results,
    };

    (status, Json(response)).into_response()
}
