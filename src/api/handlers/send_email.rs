//! Transactional email relay endpoint.
//!
//! Thin pass-through to the configured mail transport so browser clients
//! never hold the relay credential. Attachment content is forwarded as the
//! base64 the client sent; it is never decoded here.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use super::valid_email;
use crate::email::{EmailAttachment, EmailMessage, Mailer};

#[derive(ToSchema, Deserialize, Debug)]
pub struct AttachmentBody {
    pub name: String,
    pub content: String,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct SendEmailRequest {
    #[serde(rename = "recipientEmail")]
    pub recipient_email: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(rename = "htmlContent")]
    pub html_content: String,
    #[serde(default)]
    pub attachments: Vec<AttachmentBody>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SendEmailResponse {
    pub status: String,
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/v1/email/send",
    request_body = SendEmailRequest,
    responses(
        (status = 200, description = "Email accepted by the transport", body = SendEmailResponse),
        (status = 400, description = "Missing payload, recipient or content"),
        (status = 500, description = "Transport failure")
    ),
    tag = "email"
)]
pub async fn send_email(
    mailer: Extension<Arc<Mailer>>,
    payload: Option<Json<SendEmailRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    let recipient = request.recipient_email.trim();
    if recipient.is_empty() || !valid_email(recipient) {
        return (
            StatusCode::BAD_REQUEST,
            "Valid recipientEmail is required".to_string(),
        )
            .into_response();
    }
    if request.html_content.is_empty() {
        return (StatusCode::BAD_REQUEST, "htmlContent is required".to_string()).into_response();
    }

    let message = EmailMessage {
        to_email: recipient.to_string(),
        subject: request
            .subject
            .unwrap_or_else(|| "Message from CodeKrafts".to_string()),
        html: request.html_content,
        attachments: request
            .attachments
            .into_iter()
            .map(|attachment| EmailAttachment {
                name: attachment.name,
                content: attachment.content,
            })
            .collect(),
    };

    if let Err(err) = mailer.send(&message).await {
        error!("Email relay failed: {err}");
        return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
    }

    Json(SendEmailResponse {
        status: "sent".to_string(),
        message: format!("Email sent to {recipient}"),
    })
    .into_response()
}
