/// Offset pagination shared by every list query
///
/// Pages are 1-based. `page = 2, limit = 9` skips the first nine rows and
/// returns rows 10 through 18.

use serde::{Deserialize, Serialize};

/// Default page size for image grids
pub const DEFAULT_PAGE_LIMIT: i64 = 9;

/// A clamped pagination window
///
/// Fields are private so every value, deserialized ones included, goes
/// through [`Pagination::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawPagination")]
pub struct Pagination {
    page: i64,
    limit: i64,
}

#[derive(Deserialize)]
struct RawPagination {
    #[serde(default)]
    page: Option<i64>,

    #[serde(default)]
    limit: Option<i64>,
}

impl From<RawPagination> for Pagination {
    fn from(raw: RawPagination) -> Self {
        Self::new(
            raw.page.unwrap_or(1),
            raw.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        )
    }
}

impl Pagination {
    /// Builds a pagination window, clamping page and limit to at least 1
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    /// 1-based page number
    pub fn page(&self) -> i64 {
        self.page
    }

    /// Rows per page
    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// Rows to skip, saturating at `i64::MAX`
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Number of pages needed to show `total` rows
    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            return 0;
        }
        total / self.limit + i64::from(total % self.limit != 0)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_LIMIT)
    }
}

/// One page of results plus the page count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total_pages: i64,
}
