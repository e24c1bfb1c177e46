//! # CodeKrafts Account Service
//!
//! `codekrafts` is the privileged account backend for the CodeKrafts
//! platform. It owns the OTP-based email verification and credential-recovery
//! workflow, tracks login device fingerprints for later security review, and
//! proxies a small set of admin operations (bulk user deletion, self-service
//! account deletion, magic-link generation, transactional email relay) to the
//! managed Credential Store.
//!
//! ## OTP workflow
//!
//! A single endpoint accepts `{action, email, code?, newPassword?}` with
//! `action` one of `send`, `verify`, `forgot_password`, `reset_password`.
//! Codes are 6-digit decimal strings valid for 10 minutes, with at most one
//! active code per email (each issue deletes the previous ones). Consumption
//! is a conditional compare-and-delete so two concurrent verify attempts
//! cannot both succeed with the same code.
//!
//! ## Collaborators
//!
//! - The **Credential Store** (identity backend) is the source of truth for
//!   passwords and email-confirmation state; it is reached over HTTPS with a
//!   service credential.
//! - The **Profile Directory** (`profiles` table) maps identity ids to public
//!   profile fields. Verification auto-heals missing profile rows from the
//!   email local part when the Credential Store knows the address but the
//!   directory does not.
//! - Device tracking and geolocation lookups are best-effort: failures are
//!   logged and never block a login.

pub mod api;
pub mod cli;
pub mod device;
pub mod email;
pub mod identity;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
