pub mod application;
pub mod cv;
pub mod job;
pub mod user;

/// Hard cap on page sizes for every list endpoint.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Offset pagination window shared by the list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: i64,
    pub limit: i64,
}

impl Page {
    /// Clamps client-supplied values: negative skips become 0, limits land in `1..=100`.
    pub fn new(skip: Option<i64>, limit: Option<i64>, default_limit: i64) -> Self {
        Self {
            skip: skip.unwrap_or(0).max(0),
            limit: limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_SIZE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults() {
        assert_eq!(Page::new(None, None, 20), Page { skip: 0, limit: 20 });
    }

    #[test]
    fn test_page_clamps() {
        assert_eq!(Page::new(Some(-5), Some(0), 20), Page { skip: 0, limit: 1 });
        assert_eq!(
            Page::new(Some(10), Some(10_000), 20),
            Page { skip: 10, limit: MAX_PAGE_SIZE }
        );
    }
}
