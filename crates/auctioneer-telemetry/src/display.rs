//! `Display` helpers for values that show up often in log fields: durations, raw bytes,
//! and whole config/build-info structs that should be logged as a single JSON blob.
use std::{
    fmt,
    time::Duration,
};

base64_serde::base64_serde_type!(pub(crate) Base64Standard, base64::engine::general_purpose::STANDARD);

/// Formats `bytes` as standard (non-URL-safe) base64, matching how signatures and hashes
/// are logged elsewhere in this workspace.
pub fn base64(bytes: impl AsRef<[u8]>) -> impl fmt::Display {
    use base64::{
        display::Base64Display,
        engine::general_purpose::STANDARD,
    };
    struct Owned(Vec<u8>);
    impl fmt::Display for Owned {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            Base64Display::new(&self.0, &STANDARD).fmt(f)
        }
    }
    Owned(bytes.as_ref().to_vec())
}

/// Serializes `value` to a single-line JSON string for logging, falling back to the
/// `Debug` representation if serialization fails (which should not happen for the
/// config/build-info structs this is used for).
pub fn json<T: serde::Serialize>(value: &T) -> impl fmt::Display {
    serde_json::to_string(value).unwrap_or_else(|error| format!("<failed to serialize: {error}>"))
}

/// Formats a [`Duration`] the way a human would write it (`"1m 30s"`).
pub fn format_duration(duration: Duration) -> impl fmt::Display {
    humantime::format_duration(duration)
}
