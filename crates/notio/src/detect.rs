//! Recipient shape detection.
//!
//! Maps a bare recipient string to a channel name so callers can omit the
//! channel for the common shapes. Checks run in a fixed order: email
//! address, then E.164 phone number, then `@username`. Anything else is
//! left to the configured default channel.

use std::sync::LazyLock;

use regex::Regex;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+?[1-9]\d{1,14}$").unwrap());

/// Classify a recipient by shape.
///
/// Returns `None` when the shape is ambiguous (Slack channels, webhook
/// recipients, numeric chat ids and the like all need an explicit channel).
pub fn detect_channel(recipient: &str) -> Option<&'static str> {
    if EMAIL_RE.is_match(recipient) {
        return Some("email");
    }
    if PHONE_RE.is_match(recipient) {
        return Some("sms");
    }
    if recipient.starts_with('@') {
        return Some("telegram");
    }
    None
}
