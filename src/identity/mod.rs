//! Credential Store client.
//!
//! The Credential Store is the managed identity backend of record: it owns
//! passwords and the email-confirmation flag. This module wraps its admin
//! HTTP API behind a typed client so handlers never touch raw requests. All
//! calls are attempted exactly once; there is no retry logic here.

use anyhow::{anyhow, Context, Result};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::cli::globals::GlobalArgs;

pub mod directory;
pub mod resolve;

/// Page size used when scanning the full user listing for an email match.
/// The listing scan is a fallback path; the page bound keeps it predictable.
const LISTING_PAGE_SIZE: u32 = 1000;

/// Identity record as returned by the Credential Store.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct IdentityUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<String>,
    #[serde(default)]
    pub app_metadata: Value,
}

#[derive(Debug, Deserialize)]
struct UserListing {
    #[serde(default)]
    users: Vec<IdentityUser>,
}

/// Fields an admin update may change; unset fields are left untouched.
#[derive(Debug, Default, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_confirm: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_metadata: Option<Value>,
}

/// Session issued by a password grant.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Session {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: IdentityUser,
}

#[derive(Debug, Serialize)]
pub struct GenerateLinkRequest {
    #[serde(rename = "type")]
    pub link_type: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateLinkProperties {
    #[serde(default)]
    pub action_link: Option<String>,
    #[serde(default)]
    pub email_otp: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateLinkResponse {
    #[serde(default)]
    pub properties: GenerateLinkProperties,
    #[serde(default)]
    pub url: Option<String>,
}

impl GenerateLinkResponse {
    /// Prefer the action link, then the raw OTP, then the plain URL.
    #[must_use]
    pub fn preferred_link(&self) -> Option<&str> {
        self.properties
            .action_link
            .as_deref()
            .or(self.properties.email_otp.as_deref())
            .or(self.url.as_deref())
    }
}

/// Typed client for the Credential Store admin API.
#[derive(Debug)]
pub struct IdentityClient {
    client: reqwest::Client,
    base_url: String,
    service_key: SecretString,
}

impl IdentityClient {
    /// Build a client from a base URL and service credential.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: String, service_key: SecretString) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .context("Failed to build Credential Store HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
        })
    }

    /// Build a client from startup configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_globals(globals: &GlobalArgs) -> Result<Self> {
        Self::new(
            globals.identity_url.clone(),
            globals.identity_service_key.clone(),
        )
    }

    fn admin_request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(self.service_key.expose_secret())
            .header("apikey", self.service_key.expose_secret())
    }

    /// List identities from the store, bounded to a single page.
    ///
    /// # Errors
    /// Returns an error when the store is unreachable or rejects the call.
    pub async fn list_users(&self) -> Result<Vec<IdentityUser>> {
        let span = info_span!("identity.list_users", http.method = "GET");
        async {
            let response = self
                .admin_request(reqwest::Method::GET, "/admin/users")
                .query(&[("page", 1u32), ("per_page", LISTING_PAGE_SIZE)])
                .send()
                .await
                .context("Failed to reach Credential Store")?;

            if !response.status().is_success() {
                return Err(upstream_error("user listing", response).await);
            }

            let listing: UserListing = response
                .json()
                .await
                .context("Invalid user listing response")?;
            Ok(listing.users)
        }
        .instrument(span)
        .await
    }

    /// Scan the bounded user listing for a case-insensitive email match.
    ///
    /// # Errors
    /// Returns an error when the listing cannot be fetched.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<IdentityUser>> {
        let needle = email.to_lowercase();
        let users = self.list_users().await?;
        Ok(users.into_iter().find(|user| {
            user.email
                .as_deref()
                .is_some_and(|candidate| candidate.to_lowercase() == needle)
        }))
    }

    /// Apply an admin update to an identity. Safe to repeat: confirming an
    /// already-confirmed email is a no-op on the store side.
    ///
    /// # Errors
    /// Returns an error when the store rejects the update.
    pub async fn update_user(&self, id: Uuid, update: &UserUpdate) -> Result<()> {
        let span = info_span!("identity.update_user", http.method = "PUT", user_id = %id);
        async {
            let response = self
                .admin_request(reqwest::Method::PUT, &format!("/admin/users/{id}"))
                .json(update)
                .send()
                .await
                .context("Failed to reach Credential Store")?;

            if !response.status().is_success() {
                return Err(upstream_error("user update", response).await);
            }
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Delete an identity.
    ///
    /// # Errors
    /// Returns an error when the store rejects the deletion.
    pub async fn delete_user(&self, id: &str) -> Result<()> {
        let span = info_span!("identity.delete_user", http.method = "DELETE", user_id = %id);
        async {
            let response = self
                .admin_request(reqwest::Method::DELETE, &format!("/admin/users/{id}"))
                .send()
                .await
                .context("Failed to reach Credential Store")?;

            if !response.status().is_success() {
                return Err(upstream_error("user deletion", response).await);
            }
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Resolve the identity behind a caller-supplied bearer token.
    /// Returns `None` for an invalid or expired token.
    ///
    /// # Errors
    /// Returns an error when the store is unreachable.
    pub async fn user_from_token(&self, token: &str) -> Result<Option<IdentityUser>> {
        let span = info_span!("identity.user_from_token", http.method = "GET");
        async {
            let response = self
                .client
                .get(format!("{}/user", self.base_url))
                .header("apikey", self.service_key.expose_secret())
                .bearer_auth(token)
                .send()
                .await
                .context("Failed to reach Credential Store")?;

            match response.status() {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                    Ok(None)
                }
                status if status.is_success() => {
                    let user = response.json().await.context("Invalid user response")?;
                    Ok(Some(user))
                }
                _ => Err(upstream_error("token lookup", response).await),
            }
        }
        .instrument(span)
        .await
    }

    /// Generate a signup confirmation link.
    ///
    /// # Errors
    /// Returns an error when the store rejects the request.
    pub async fn generate_link(&self, request: &GenerateLinkRequest) -> Result<GenerateLinkResponse> {
        let span = info_span!("identity.generate_link", http.method = "POST");
        async {
            let response = self
                .admin_request(reqwest::Method::POST, "/admin/generate_link")
                .json(request)
                .send()
                .await
                .context("Failed to reach Credential Store")?;

            if !response.status().is_success() {
                return Err(upstream_error("link generation", response).await);
            }

            response
                .json()
                .await
                .context("Invalid link generation response")
        }
        .instrument(span)
        .await
    }

    /// Issue a session from email/password credentials. Returns `None` when
    /// the credentials are rejected, `Err` for any other upstream failure.
    ///
    /// # Errors
    /// Returns an error when the store is unreachable or misbehaves.
    pub async fn password_grant(&self, email: &str, password: &str) -> Result<Option<Session>> {
        let span = info_span!("identity.password_grant", http.method = "POST");
        async {
            let response = self
                .client
                .post(format!("{}/token", self.base_url))
                .query(&[("grant_type", "password")])
                .header("apikey", self.service_key.expose_secret())
                .json(&serde_json::json!({ "email": email, "password": password }))
                .send()
                .await
                .context("Failed to reach Credential Store")?;

            match response.status() {
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => Ok(None),
                status if status.is_success() => {
                    let session = response.json().await.context("Invalid session response")?;
                    Ok(Some(session))
                }
                _ => Err(upstream_error("password grant", response).await),
            }
        }
        .instrument(span)
        .await
    }
}

/// Fold a failed upstream response into an error carrying its message.
async fn upstream_error(operation: &str, response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    let detail = match response.json::<Value>().await {
        Ok(body) => body
            .get("msg")
            .or_else(|| body.get("message"))
            .or_else(|| body.get("error_description"))
            .or_else(|| body.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string()),
        Err(_) => String::new(),
    };
    anyhow!("Credential Store {operation} failed: {status} {detail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use secrecy::SecretString;

    #[test]
    fn client_trims_trailing_slash() -> Result<()> {
        let client = IdentityClient::new(
            "https://identity.codekrafts.dev/".to_string(),
            SecretString::from("key"),
        )?;
        assert_eq!(client.base_url, "https://identity.codekrafts.dev");
        Ok(())
    }

    #[test]
    fn user_update_serializes_only_set_fields() -> Result<()> {
        let update = UserUpdate {
            email_confirm: Some(true),
            ..UserUpdate::default()
        };
        let value = serde_json::to_value(&update)?;
        assert_eq!(value, serde_json::json!({ "email_confirm": true }));
        Ok(())
    }

    #[test]
    fn preferred_link_prefers_action_link() {
        let response = GenerateLinkResponse {
            properties: GenerateLinkProperties {
                action_link: Some("https://a".to_string()),
                email_otp: Some("123456".to_string()),
            },
            url: Some("https://u".to_string()),
        };
        assert_eq!(response.preferred_link(), Some("https://a"));
    }

    #[test]
    fn preferred_link_falls_back_to_otp_then_url() {
        let response = GenerateLinkResponse {
            properties: GenerateLinkProperties {
                action_link: None,
                email_otp: Some("123456".to_string()),
            },
            url: Some("https://u".to_string()),
        };
        assert_eq!(response.preferred_link(), Some("123456"));

        let response = GenerateLinkResponse {
            properties: GenerateLinkProperties::default(),
            url: Some("https://u".to_string()),
        };
        assert_eq!(response.preferred_link(), Some("https://u"));
    }

    #[test]
    fn identity_user_deserializes_with_missing_fields() -> Result<()> {
        let user: IdentityUser = serde_json::from_value(serde_json::json!({
            "id": "00000000-0000-0000-0000-000000000001"
        }))?;
        assert!(user.email.is_none());
        assert!(user.email_confirmed_at.is_none());
        Ok(())
    }
}
