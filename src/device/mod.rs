//! Login device tracking.
//!
//! Fingerprints the client of a successful password login (device class,
//! browser, OS, coarse location) for later security review. The whole
//! subsystem is best-effort: it runs in a spawned task, swallows every
//! failure, and never gates or delays the login that triggered it.

pub mod fingerprint;
pub mod geo;
pub mod tracking;

pub use fingerprint::{classify_browser, classify_device_type, classify_os, DeviceType};
pub use geo::GeoClient;
pub use tracking::spawn_track_login;
