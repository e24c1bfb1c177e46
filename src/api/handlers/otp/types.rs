//! Request/response types for the OTP endpoint.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The four OTP workflow actions. Anything else is rejected explicitly; an
/// unrecognized action is a client error, never a silent no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OtpAction {
    Send,
    Verify,
    ForgotPassword,
    ResetPassword,
}

impl OtpAction {
    #[must_use]
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "send" => Some(Self::Send),
            "verify" => Some(Self::Verify),
            "forgot_password" => Some(Self::ForgotPassword),
            "reset_password" => Some(Self::ResetPassword),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::Verify => "verify",
            Self::ForgotPassword => "forgot_password",
            Self::ResetPassword => "reset_password",
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct OtpRequest {
    pub action: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, rename = "newPassword")]
    pub new_password: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct OtpResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OtpResponse {
    #[must_use]
    pub fn ok(message: &str) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
            error: None,
        }
    }

    #[must_use]
    pub fn err(error: &str) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn action_parse_round_trips() {
        for action in [
            OtpAction::Send,
            OtpAction::Verify,
            OtpAction::ForgotPassword,
            OtpAction::ResetPassword,
        ] {
            assert_eq!(OtpAction::parse(action.as_str()), Some(action));
        }
    }

    #[test]
    fn action_parse_rejects_unknown() {
        assert_eq!(OtpAction::parse("resend"), None);
        assert_eq!(OtpAction::parse(""), None);
        assert_eq!(OtpAction::parse("SEND"), None);
    }

    #[test]
    fn request_accepts_camel_case_password() -> Result<()> {
        let request: OtpRequest = serde_json::from_value(serde_json::json!({
            "action": "reset_password",
            "email": "a@x.com",
            "code": "123456",
            "newPassword": "Str0ngP@ss"
        }))?;
        assert_eq!(request.new_password.as_deref(), Some("Str0ngP@ss"));
        Ok(())
    }

    #[test]
    fn response_omits_empty_fields() -> Result<()> {
        let value = serde_json::to_value(OtpResponse::ok("OTP sent"))?;
        assert_eq!(value, serde_json::json!({"success": true, "message": "OTP sent"}));

        let value = serde_json::to_value(OtpResponse::err("Code expired"))?;
        assert_eq!(
            value,
            serde_json::json!({"success": false, "error": "Code expired"})
        );
        Ok(())
    }
}
