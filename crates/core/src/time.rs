//! Timestamp helpers.
//!
//! All persisted and wire-visible timestamps are ISO-8601 (RFC3339) strings.

use chrono::Utc;

/// Current instant as an RFC3339 string.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_rfc3339() {
        let stamp = now_rfc3339();
        assert!(chrono::DateTime::parse_from_rfc3339(&stamp).is_ok());
    }
}
