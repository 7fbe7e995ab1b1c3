//! The response envelope every backend endpoint wraps its payload in.

use serde::{Deserialize, Serialize};

/// `{success, data, error?, pagination?}` as returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    /// Missing on some error responses, hence optional.
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T> Envelope<T> {
    /// A successful envelope without pagination.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            pagination: None,
        }
    }

    /// A failed envelope carrying only an error message.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            pagination: None,
        }
    }
}

/// Server-side pagination cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    #[serde(default)]
    pub pages: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
            total: 0,
            pages: 0,
        }
    }
}

impl Pagination {
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.pages
    }

    /// One-based inclusive row range shown on the current page, `None` when empty.
    pub fn visible_range(&self) -> Option<(u64, u64)> {
        if self.total == 0 {
            return None;
        }
        let per_page = u64::from(self.per_page.max(1));
        let first = u64::from(self.page.saturating_sub(1)) * per_page + 1;
        let last = (u64::from(self.page) * per_page).min(self.total);
        Some((first, last))
    }
}
