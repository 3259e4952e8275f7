use crate::shared::AppError;

/// Default page size for the public feed
pub const FEED_PAGE_LIMIT: u32 = 5;
/// Default page size for a user's own books
pub const USER_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 50;

/// A validated (page, limit) pair; pages are 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Result<Self, AppError> {
        if page == 0 {
            return Err(AppError::Validation(
                "page must be a positive integer".to_string(),
            ));
        }
        if limit == 0 {
            return Err(AppError::Validation(
                "limit must be a positive integer".to_string(),
            ));
        }
        if limit > MAX_PAGE_LIMIT {
            return Err(AppError::Validation(format!(
                "limit must not exceed {MAX_PAGE_LIMIT}"
            )));
        }
        Ok(Self { page, limit })
    }

    /// Builds a request from raw query values; absent or blank values take the defaults
    pub fn from_query(
        page: Option<&str>,
        limit: Option<&str>,
        default_limit: u32,
    ) -> Result<Self, AppError> {
        let page = parse_param("page", page)?.unwrap_or(1);
        let limit = parse_param("limit", limit)?.unwrap_or(default_limit);
        Self::new(page, limit)
    }

    pub fn skip(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.limit))
    }
}

fn parse_param(name: &str, raw: Option<&str>) -> Result<Option<u32>, AppError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse::<u32>()
            .map(Some)
            .map_err(|_| AppError::Validation(format!("{name} must be a positive integer"))),
    }
}

/// One page of results plus the totals needed to render pagination
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub total_items: u64,
    pub total_pages: u64,
}
