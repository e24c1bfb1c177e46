//! Outbound email transport.
//!
//! The mailer is constructed once at startup from CLI/env configuration and
//! injected into handlers; nothing builds a transport per request. With a
//! relay API key configured it posts JSON to the transactional relay,
//! otherwise it logs the message and reports success, which keeps local
//! development and tests free of network calls.

use anyhow::{anyhow, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, Instrument};

use crate::cli::globals::GlobalArgs;

/// A rendered message ready for delivery.
#[derive(Clone, Debug)]
pub struct EmailMessage {
    pub to_email: String,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<EmailAttachment>,
}

/// File attachment; `content` is base64 as supplied by the caller.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmailAttachment {
    pub name: String,
    pub content: String,
}

#[derive(Serialize)]
struct RelayAddress<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RelayBody<'a> {
    sender: RelayAddress<'a>,
    to: Vec<RelayAddress<'a>>,
    subject: &'a str,
    html_content: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachment: Vec<&'a EmailAttachment>,
}

#[derive(Debug)]
enum Transport {
    /// HTTP transactional relay (Brevo-style JSON API).
    Relay {
        client: reqwest::Client,
        url: String,
        api_key: SecretString,
    },
    /// Log-and-succeed transport for local development and tests.
    Log,
}

/// Dependency-injected email transport client.
#[derive(Debug)]
pub struct Mailer {
    sender_email: String,
    sender_name: String,
    transport: Transport,
}

impl Mailer {
    /// Build a relay-backed mailer.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn relay(
        url: String,
        api_key: SecretString,
        sender_email: String,
        sender_name: String,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .context("Failed to build email relay HTTP client")?;

        Ok(Self {
            sender_email,
            sender_name,
            transport: Transport::Relay {
                client,
                url,
                api_key,
            },
        })
    }

    /// Build a mailer that logs instead of sending.
    #[must_use]
    pub fn log(sender_email: String, sender_name: String) -> Self {
        Self {
            sender_email,
            sender_name,
            transport: Transport::Log,
        }
    }

    /// Pick the transport from startup configuration: relay when an API key
    /// is present, log otherwise.
    ///
    /// # Errors
    /// Returns an error if the relay client cannot be constructed.
    pub fn from_globals(globals: &GlobalArgs) -> Result<Self> {
        match &globals.relay_api_key {
            Some(key) => Self::relay(
                globals.relay_url.clone(),
                key.clone(),
                globals.sender_email.clone(),
                globals.sender_name.clone(),
            ),
            None => Ok(Self::log(
                globals.sender_email.clone(),
                globals.sender_name.clone(),
            )),
        }
    }

    /// Deliver a message, or return the relay's error.
    ///
    /// # Errors
    /// Returns an error when the relay rejects the message or is unreachable.
    pub async fn send(&self, message: &EmailMessage) -> Result<()> {
        match &self.transport {
            Transport::Log => {
                info!(
                    to_email = %message.to_email,
                    subject = %message.subject,
                    "email transport is log-only; message not sent"
                );
                Ok(())
            }
            Transport::Relay {
                client,
                url,
                api_key,
            } => {
                let body = RelayBody {
                    sender: RelayAddress {
                        email: &self.sender_email,
                        name: Some(&self.sender_name),
                    },
                    to: vec![RelayAddress {
                        email: &message.to_email,
                        name: None,
                    }],
                    subject: &message.subject,
                    html_content: &message.html,
                    attachment: message.attachments.iter().collect(),
                };

                let span = info_span!(
                    "email.send",
                    http.method = "POST",
                    to_email = %message.to_email
                );
                async {
                    let response = client
                        .post(url)
                        .header("api-key", api_key.expose_secret())
                        .json(&body)
                        .send()
                        .await
                        .context("Failed to reach email relay")?;

                    let status = response.status();
                    if status.is_success() {
                        return Ok(());
                    }

                    let detail = response.text().await.unwrap_or_default();
                    Err(anyhow!("email relay rejected message: {status} {detail}"))
                }
                .instrument(span)
                .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn message() -> EmailMessage {
        EmailMessage {
            to_email: "alice@example.com".to_string(),
            subject: "Hello".to_string(),
            html: "<p>Hi</p>".to_string(),
            attachments: Vec::new(),
        }
    }

    #[tokio::test]
    async fn log_transport_always_succeeds() -> Result<()> {
        let mailer = Mailer::log("no-reply@codekrafts.dev".to_string(), "CodeKrafts".to_string());
        mailer.send(&message()).await?;
        Ok(())
    }

    #[test]
    fn relay_body_serializes_camel_case() -> Result<()> {
        let attachment = EmailAttachment {
            name: "invoice.pdf".to_string(),
            content: "aGVsbG8=".to_string(),
        };
        let body = RelayBody {
            sender: RelayAddress {
                email: "no-reply@codekrafts.dev",
                name: Some("CodeKrafts"),
            },
            to: vec![RelayAddress {
                email: "alice@example.com",
                name: None,
            }],
            subject: "Hello",
            html_content: "<p>Hi</p>",
            attachment: vec![&attachment],
        };
        let value = serde_json::to_value(&body)?;
        assert!(value.get("htmlContent").is_some());
        assert_eq!(value["sender"]["email"], "no-reply@codekrafts.dev");
        assert_eq!(value["to"][0]["email"], "alice@example.com");
        assert!(value["to"][0].get("name").is_none());
        assert_eq!(value["attachment"][0]["name"], "invoice.pdf");
        Ok(())
    }

    #[test]
    fn relay_body_omits_empty_attachments() -> Result<()> {
        let body = RelayBody {
            sender: RelayAddress {
                email: "no-reply@codekrafts.dev",
                name: None,
            },
            to: vec![],
            subject: "Hello",
            html_content: "<p>Hi</p>",
            attachment: vec![],
        };
        let value = serde_json::to_value(&body)?;
        assert!(value.get("attachment").is_none());
        Ok(())
    }
}
