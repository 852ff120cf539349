//! Offset pagination shared by every list endpoint.

use serde::Serialize;

/// Default page size for most lists.
pub const DEFAULT_LIMIT: i64 = 10;

/// Default page size for notifications.
pub const NOTIFICATION_LIMIT: i64 = 20;

/// Largest page size a client may request.
pub const MAX_LIMIT: i64 = 100;

/// A validated `page` / `limit` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    /// Parse raw query values. Missing, non-numeric or non-positive values
    /// fall back to defaults and `limit` is clamped to `1..=MAX_LIMIT`.
    pub fn parse(page: Option<&str>, limit: Option<&str>, default_limit: i64) -> Self {
        let page = page
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p > 0)
            .unwrap_or(1);
        let limit = limit
            .and_then(|l| l.trim().parse::<i64>().ok())
            .filter(|l| *l > 0)
            .unwrap_or(default_limit)
            .min(MAX_LIMIT);

        Self { page, limit }
    }

    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_LIMIT),
        }
    }

    /// Rows to skip.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Links to the neighbouring pages given the total row count.
    pub fn links(&self, total: i64) -> PageLinks {
        let next = (self.page.saturating_mul(self.limit) < total).then(|| PageRef {
            page: self.page + 1,
            limit: self.limit,
        });
        let prev = (self.offset() > 0).then(|| PageRef {
            page: self.page - 1,
            limit: self.limit,
        });

        PageLinks { next, prev }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Pointer to another page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRef {
    pub page: i64,
    pub limit: i64,
}

/// `pagination` object of a list response. Absent links are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

/// One page of rows plus the unpaginated total.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64) -> Self {
        Self { items, total }
    }

    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(None, None, 1, 10; "defaults")]
    #[test_case(Some("3"), Some("25"), 3, 25; "explicit")]
    #[test_case(Some("abc"), Some("-4"), 1, 10; "garbage falls back")]
    #[test_case(Some("0"), Some("0"), 1, 10; "zero falls back")]
    #[test_case(Some("2"), Some("500"), 2, 100; "limit clamped")]
    fn test_parse(page: Option<&str>, limit: Option<&str>, want_page: i64, want_limit: i64) {
        let req = PageRequest::parse(page, limit, DEFAULT_LIMIT);
        assert_eq!(req.page, want_page);
        assert_eq!(req.limit, want_limit);
    }

    #[test]
    fn test_notification_default_limit() {
        let req = PageRequest::parse(None, None, NOTIFICATION_LIMIT);
        assert_eq!(req.limit, 20);
    }

    #[test]
    fn test_first_page_has_only_next() {
        let links = PageRequest::new(1, 10).links(25);
        assert_eq!(links.next, Some(PageRef { page: 2, limit: 10 }));
        assert_eq!(links.prev, None);
    }

    #[test]
    fn test_last_page_has_only_prev() {
        let links = PageRequest::new(3, 10).links(25);
        assert_eq!(links.next, None);
        assert_eq!(links.prev, Some(PageRef { page: 2, limit: 10 }));
    }

    #[test]
    fn test_exact_fit_has_no_next() {
        let links = PageRequest::new(2, 10).links(20);
        assert_eq!(links.next, None);
        assert!(links.prev.is_some());
    }

    #[test]
    fn test_empty_links_serialize_as_empty_object() {
        let json = serde_json::to_string(&PageRequest::default().links(0)).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest::new(1, 10).offset(), 0);
        assert_eq!(PageRequest::new(4, 20).offset(), 60);
    }
}
