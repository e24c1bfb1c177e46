//! Magic-link generation for invitation and signup flows.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use super::valid_email;
use crate::identity::{GenerateLinkRequest, IdentityClient};

#[derive(ToSchema, Deserialize, Debug)]
pub struct GenerateLinkBody {
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default, rename = "redirectTo")]
    pub redirect_to: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct GenerateLinkReply {
    pub success: bool,
    pub link: String,
}

#[utoipa::path(
    post,
    path = "/v1/admin/generate-link",
    request_body = GenerateLinkBody,
    responses(
        (status = 200, description = "Confirmation link generated", body = GenerateLinkReply),
        (status = 400, description = "Missing payload or email"),
        (status = 500, description = "Credential Store failure")
    ),
    tag = "admin"
)]
pub async fn generate_link(
    identity: Extension<Arc<IdentityClient>>,
    payload: Option<Json<GenerateLinkBody>>,
) -> impl IntoResponse {
    let Some(Json(body)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    let email = body.email.trim();
    if email.is_empty() || !valid_email(email) {
        return (StatusCode::BAD_REQUEST, "Valid email is required".to_string()).into_response();
    }

    let request = GenerateLinkRequest {
        link_type: "signup".to_string(),
        email: email.to_string(),
        password: body.password,
        data: body.data,
        redirect_to: body.redirect_to,
    };

    let response = match identity.generate_link(&request).await {
        Ok(response) => response,
        Err(err) => {
            error!("Link generation failed: {err}");
            return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
        }
    };

    let Some(link) = response.preferred_link() else {
        error!("Link generation returned no usable link");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "No link in upstream response".to_string(),
        )
            .into_response();
    };

    Json(GenerateLinkReply {
        success: true,
        link: link.to_string(),
    })
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn body_accepts_camel_case_redirect() -> Result<()> {
        let body: GenerateLinkBody = serde_json::from_value(serde_json::json!({
            "email": "a@x.com",
            "redirectTo": "https://codekrafts.dev/welcome"
        }))?;
        assert_eq!(
            body.redirect_to.as_deref(),
            Some("https://codekrafts.dev/welcome")
        );
        Ok(())
    }

    #[test]
    fn optional_fields_default_to_none() -> Result<()> {
        let body: GenerateLinkBody =
            serde_json::from_value(serde_json::json!({"email": "a@x.com"}))?;
        assert!(body.password.is_none());
        assert!(body.data.is_none());
        assert!(body.redirect_to.is_none());
        Ok(())
    }
}
