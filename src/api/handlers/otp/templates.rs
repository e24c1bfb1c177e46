//! HTML templates for OTP email.
//!
//! The code is rendered in large, spaced text so it is easy to read and
//! retype. Templates stay inline; there is no template engine for two
//! messages.

/// Subject and body for the account-verification email.
#[must_use]
pub fn verification_email(code: &str) -> (String, String) {
    let subject = "Your Verification Code".to_string();
    let html = format!(
        r#"<div style="font-family: sans-serif; max-width: 600px; margin: 0 auto;">
    <h2>Verify your CodeKrafts account</h2>
    <p>Your verification code is:</p>
    <h1 style="background: #f4f4f5; padding: 20px; font-size: 32px; letter-spacing: 5px; text-align: center; border-radius: 10px;">{code}</h1>
    <p>This code expires in 10 minutes.</p>
</div>"#
    );
    (subject, html)
}

/// Subject and body for the password-reset email.
#[must_use]
pub fn password_reset_email(code: &str) -> (String, String) {
    let subject = "Reset Your Password - CodeKrafts".to_string();
    let html = format!(
        r#"<div style="font-family: sans-serif; max-width: 600px; margin: 0 auto;">
    <h2>Password reset request</h2>
    <p>We received a request to reset your CodeKrafts password. If you did not make this request, you can safely ignore this email.</p>
    <p>Your reset code is:</p>
    <h1 style="background: #f4f4f5; padding: 20px; font-size: 32px; letter-spacing: 5px; text-align: center; border-radius: 10px;">{code}</h1>
    <p>This code expires in 10 minutes and can only be used once.</p>
</div>"#
    );
    (subject, html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_email_contains_code() {
        let (subject, html) = verification_email("123456");
        assert_eq!(subject, "Your Verification Code");
        assert!(html.contains("123456"));
        assert!(html.contains("expires in 10 minutes"));
    }

    #[test]
    fn reset_email_contains_code_and_warning() {
        let (subject, html) = password_reset_email("654321");
        assert!(subject.contains("Reset"));
        assert!(html.contains("654321"));
        assert!(html.contains("ignore this email"));
    }
}
