//! Shared wire types for the homevoice admin console.
//!
//! Every entity here is owned by the backend; the console only holds
//! transient copies decoded from the `{success, data, pagination?}` envelope.

pub mod chat;
pub mod device;
pub mod envelope;
pub mod llm;
pub mod model;
pub mod training;

pub use envelope::{Envelope, Pagination};

/// Truncate a string to at most `max_chars` characters, respecting char
/// boundaries (labels here are frequently CJK).
pub fn truncate_str(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_ascii() {
        assert_eq!(truncate_str("hello world", 5), "hello");
        assert_eq!(truncate_str("hi", 5), "hi");
    }

    #[test]
    fn truncate_multibyte() {
        assert_eq!(truncate_str("打开客厅灯", 2), "打开");
        assert_eq!(truncate_str("打开客厅灯", 10), "打开客厅灯");
    }
}
