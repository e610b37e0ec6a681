//! Request DTOs.

use serde::Deserialize;

use crate::file::Pagination;

/// Query parameters for listing files.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// 1-based page number (default 1).
    pub page: Option<u32>,
    /// Files per page (default 20, max 100).
    pub page_size: Option<u32>,
}

impl From<ListQuery> for Pagination {
    fn from(query: ListQuery) -> Self {
        Pagination::new(query.page, query.page_size)
    }
}
