//! Log sanitization utilities
//!
//! Keeps secrets and bulky storage payloads out of debug logs.

/// Maximum number of bytes to include in truncated log output.
const TRUNCATE_LIMIT: usize = 256;

/// Placeholder displayed instead of a masked value.
pub const MASK: &str = "*******";

fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        s.len()
    } else {
        let mut i = index;
        while i > 0 && !s.is_char_boundary(i) {
            i -= 1;
        }
        i
    }
}

/// Truncate a string for safe logging.
///
/// Returns the original string if it's within the limit, otherwise the first
/// `TRUNCATE_LIMIT` bytes with a suffix indicating the total length.
pub fn truncate_for_log(s: &str) -> String {
    if s.len() <= TRUNCATE_LIMIT {
        s.to_string()
    } else {
        format!(
            "{}... [truncated, total {} bytes]",
            &s[..floor_char_boundary(s, TRUNCATE_LIMIT)],
            s.len()
        )
    }
}

/// Render a configuration value for logs, hiding it entirely when masked.
pub fn sanitize_value(value: &serde_json::Value, masked: bool) -> String {
    if masked {
        return MASK.to_string();
    }
    match value {
        serde_json::Value::String(s) => truncate_for_log(s),
        other => truncate_for_log(&other.to_string()),
    }
}
