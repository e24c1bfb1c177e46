//! OpenAPI document for the account service endpoints.

use utoipa::OpenApi;

use super::handlers::{account, admin, health, link, login, otp, send_email};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "CodeKrafts Account Service",
        description = "OTP verification, credential recovery and privileged account operations"
    ),
    paths(
        health::health,
        otp::otp,
        login::login,
        admin::delete_users,
        account::delete_account,
        link::generate_link,
        send_email::send_email,
    ),
    components(schemas(
        health::Health,
        otp::types::OtpRequest,
        otp::types::OtpResponse,
        login::LoginRequest,
        admin::DeleteUsersRequest,
        admin::DeleteUsersResponse,
        admin::DeletionResult,
        account::DeleteAccountResponse,
        link::GenerateLinkBody,
        link::GenerateLinkReply,
        send_email::SendEmailRequest,
        send_email::SendEmailResponse,
    ))
)]
pub struct ApiDoc;
