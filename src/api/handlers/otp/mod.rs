//! The OTP workflow engine.
//!
//! One endpoint, four actions: `send` and `forgot_password` issue a code,
//! `verify` and `reset_password` consume one. The code is only ever
//! delivered out-of-band by email; responses never echo it. Error messages
//! stay deliberately coarse: a wrong code and a nonexistent code produce the
//! same response, while a matched-but-expired code gets the more specific
//! "Code expired".

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::api::handlers::{now_unix_seconds, valid_email};
use crate::email::{EmailMessage, Mailer};
use crate::identity::resolve::resolve_identity;
use crate::identity::{IdentityClient, UserUpdate};

pub mod ledger;
pub mod templates;
pub mod types;

use ledger::{consume_code, generate_code, issue_code, ConsumeOutcome};
use types::{OtpAction, OtpRequest, OtpResponse};

fn respond(status: StatusCode, body: OtpResponse) -> Response {
    (status, Json(body)).into_response()
}

#[utoipa::path(
    post,
    path = "/v1/otp",
    request_body = OtpRequest,
    responses(
        (status = 200, description = "Action succeeded", body = OtpResponse),
        (status = 400, description = "Missing field, unknown action or invalid code", body = OtpResponse),
        (status = 404, description = "Account not found", body = OtpResponse),
        (status = 500, description = "Collaborator failure", body = OtpResponse)
    ),
    tag = "otp"
)]
pub async fn otp(
    pool: Extension<PgPool>,
    identity: Extension<Arc<IdentityClient>>,
    mailer: Extension<Arc<Mailer>>,
    payload: Option<Json<OtpRequest>>,
) -> impl IntoResponse {
    let request: OtpRequest = match payload {
        Some(Json(payload)) => payload,
        None => return respond(StatusCode::BAD_REQUEST, OtpResponse::err("Missing payload")),
    };

    let email = match request.email.as_deref().map(str::trim) {
        Some(email) if !email.is_empty() => email,
        _ => return respond(StatusCode::BAD_REQUEST, OtpResponse::err("Email is required")),
    };
    if !valid_email(email) {
        return respond(StatusCode::BAD_REQUEST, OtpResponse::err("Invalid email"));
    }

    let Some(action) = OtpAction::parse(&request.action) else {
        return respond(StatusCode::BAD_REQUEST, OtpResponse::err("Unknown action"));
    };

    match action {
        OtpAction::Send => send(&pool, &mailer, email).await,
        OtpAction::Verify => verify(&pool, &identity, email, request.code.as_deref()).await,
        OtpAction::ForgotPassword => forgot_password(&pool, &mailer, email).await,
        OtpAction::ResetPassword => {
            reset_password(
                &identity,
                &pool,
                email,
                request.code.as_deref(),
                request.new_password.as_deref(),
            )
            .await
        }
    }
}

/// Issue a code for new-account confirmation. The email send is part of the
/// action: a transport failure fails the request so the client can retry.
async fn send(pool: &PgPool, mailer: &Mailer, email: &str) -> Response {
    let code = generate_code();
    if let Err(err) = issue_code(pool, email, &code).await {
        error!("Failed to issue verification code: {err}");
        return respond(
            StatusCode::INTERNAL_SERVER_ERROR,
            OtpResponse::err(&err.to_string()),
        );
    }

    let (subject, html) = templates::verification_email(&code);
    let message = EmailMessage {
        to_email: email.to_string(),
        subject,
        html,
        attachments: Vec::new(),
    };
    if let Err(err) = mailer.send(&message).await {
        error!("Failed to send verification email: {err}");
        return respond(
            StatusCode::INTERNAL_SERVER_ERROR,
            OtpResponse::err(&err.to_string()),
        );
    }

    respond(StatusCode::OK, OtpResponse::ok("OTP sent"))
}

/// Consume a code and mark the account's email confirmed.
async fn verify(
    pool: &PgPool,
    identity: &IdentityClient,
    email: &str,
    code: Option<&str>,
) -> Response {
    let Some(code) = code.map(str::trim).filter(|code| !code.is_empty()) else {
        return respond(StatusCode::BAD_REQUEST, OtpResponse::err("Code is required"));
    };

    match consume_code(pool, email, code).await {
        Ok(ConsumeOutcome::Consumed) => {}
        Ok(ConsumeOutcome::Expired) => {
            return respond(StatusCode::BAD_REQUEST, OtpResponse::err("Code expired"));
        }
        Ok(ConsumeOutcome::Missing) => {
            return respond(
                StatusCode::BAD_REQUEST,
                OtpResponse::err("Invalid or expired code"),
            );
        }
        Err(err) => {
            error!("Failed to consume verification code: {err}");
            return respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                OtpResponse::err(&err.to_string()),
            );
        }
    }

    let resolved = match resolve_identity(pool, identity, email).await {
        Ok(Some(resolved)) => resolved,
        Ok(None) => {
            return respond(StatusCode::NOT_FOUND, OtpResponse::err("Account not found"));
        }
        Err(err) => {
            error!("Failed to resolve identity: {err}");
            return respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                OtpResponse::err(&err.to_string()),
            );
        }
    };

    // Idempotent on the store side; re-confirming is harmless.
    let update = UserUpdate {
        email_confirm: Some(true),
        ..UserUpdate::default()
    };
    if let Err(err) = identity.update_user(resolved.id, &update).await {
        error!("Failed to confirm email: {err}");
        return respond(
            StatusCode::INTERNAL_SERVER_ERROR,
            OtpResponse::err(&err.to_string()),
        );
    }

    info!(user_id = %resolved.id, source = ?resolved.source, "email verified");
    respond(StatusCode::OK, OtpResponse::ok("Verified"))
}

/// Issue a code for password recovery. The response never reveals whether
/// the address has an account, and transport failures are swallowed for the
/// same reason.
async fn forgot_password(pool: &PgPool, mailer: &Mailer, email: &str) -> Response {
    let code = generate_code();
    if let Err(err) = issue_code(pool, email, &code).await {
        error!("Failed to issue reset code: {err}");
        return respond(
            StatusCode::INTERNAL_SERVER_ERROR,
            OtpResponse::err(&err.to_string()),
        );
    }

    let (subject, html) = templates::password_reset_email(&code);
    let message = EmailMessage {
        to_email: email.to_string(),
        subject,
        html,
        attachments: Vec::new(),
    };
    if let Err(err) = mailer.send(&message).await {
        warn!("Failed to send reset email: {err}");
    }

    respond(
        StatusCode::OK,
        OtpResponse::ok("If an account exists, a code has been sent"),
    )
}

/// Consume a code and rotate the account password. Identity resolution goes
/// straight to the Credential Store listing; the Profile Directory may lag
/// and is never trusted for a credential change.
async fn reset_password(
    identity: &IdentityClient,
    pool: &PgPool,
    email: &str,
    code: Option<&str>,
    new_password: Option<&str>,
) -> Response {
    let Some(code) = code.map(str::trim).filter(|code| !code.is_empty()) else {
        return respond(StatusCode::BAD_REQUEST, OtpResponse::err("Code is required"));
    };
    let Some(new_password) = new_password.filter(|password| !password.is_empty()) else {
        return respond(
            StatusCode::BAD_REQUEST,
            OtpResponse::err("New password is required"),
        );
    };

    match consume_code(pool, email, code).await {
        Ok(ConsumeOutcome::Consumed) => {}
        Ok(ConsumeOutcome::Expired) => {
            return respond(StatusCode::BAD_REQUEST, OtpResponse::err("Code expired"));
        }
        Ok(ConsumeOutcome::Missing) => {
            return respond(
                StatusCode::BAD_REQUEST,
                OtpResponse::err("Invalid or expired code"),
            );
        }
        Err(err) => {
            error!("Failed to consume reset code: {err}");
            return respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                OtpResponse::err(&err.to_string()),
            );
        }
    }

    let user = match identity.find_user_by_email(email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return respond(StatusCode::NOT_FOUND, OtpResponse::err("Account not found"));
        }
        Err(err) => {
            error!("Failed to look up account for reset: {err}");
            return respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                OtpResponse::err(&err.to_string()),
            );
        }
    };

    // Proving inbox control also unblocks a previously unconfirmed login,
    // and the reset moment is kept for audit.
    let update = UserUpdate {
        password: Some(new_password.to_string()),
        email_confirm: Some(true),
        app_metadata: Some(serde_json::json!({
            "password_reset_at": now_unix_seconds(),
        })),
    };
    if let Err(err) = identity.update_user(user.id, &update).await {
        error!("Failed to update password: {err}");
        return respond(
            StatusCode::INTERNAL_SERVER_ERROR,
            OtpResponse::err(&err.to_string()),
        );
    }

    info!(user_id = %user.id, "password reset completed");
    respond(StatusCode::OK, OtpResponse::ok("Password updated"))
}

#[cfg(test)]
mod tests {
    use super::types::{OtpRequest, OtpResponse};
    use super::*;
    use anyhow::Result;
    use axum::body::to_bytes;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;

    fn identity_client() -> Result<Arc<IdentityClient>> {
        Ok(Arc::new(IdentityClient::new(
            "https://identity.test".to_string(),
            SecretString::from("service-key"),
        )?))
    }

    fn mailer() -> Arc<Mailer> {
        Arc::new(Mailer::log(
            "no-reply@codekrafts.dev".to_string(),
            "CodeKrafts".to_string(),
        ))
    }

    fn lazy_pool() -> Result<PgPool> {
        Ok(PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?)
    }

    async fn call(request: Option<OtpRequest>) -> Result<(StatusCode, OtpResponse)> {
        let response = otp(
            Extension(lazy_pool()?),
            Extension(identity_client()?),
            Extension(mailer()),
            request.map(Json),
        )
        .await
        .into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = serde_json::from_slice(&bytes)?;
        Ok((status, body))
    }

    fn request(action: &str) -> OtpRequest {
        OtpRequest {
            action: action.to_string(),
            email: Some("alice@example.com".to_string()),
            code: None,
            new_password: None,
        }
    }

    #[tokio::test]
    async fn missing_payload_is_client_error() -> Result<()> {
        let (status, body) = call(None).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.as_deref(), Some("Missing payload"));
        Ok(())
    }

    #[tokio::test]
    async fn missing_email_is_client_error() -> Result<()> {
        let mut otp_request = request("send");
        otp_request.email = None;
        let (status, body) = call(Some(otp_request)).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.as_deref(), Some("Email is required"));

        let mut otp_request = request("send");
        otp_request.email = Some("  ".to_string());
        let (status, _) = call(Some(otp_request)).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_action_is_rejected_explicitly() -> Result<()> {
        let (status, body) = call(Some(request("resend"))).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.as_deref(), Some("Unknown action"));
        Ok(())
    }

    #[tokio::test]
    async fn verify_requires_code() -> Result<()> {
        let (status, body) = call(Some(request("verify"))).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.as_deref(), Some("Code is required"));
        Ok(())
    }

    #[tokio::test]
    async fn reset_requires_code_and_password() -> Result<()> {
        let (status, body) = call(Some(request("reset_password"))).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.as_deref(), Some("Code is required"));

        let mut otp_request = request("reset_password");
        otp_request.code = Some("123456".to_string());
        let (status, body) = call(Some(otp_request)).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.as_deref(), Some("New password is required"));
        Ok(())
    }

    #[tokio::test]
    async fn invalid_email_is_rejected() -> Result<()> {
        let mut otp_request = request("send");
        otp_request.email = Some("not-an-email".to_string());
        let (status, body) = call(Some(otp_request)).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.as_deref(), Some("Invalid email"));
        Ok(())
    }
}
