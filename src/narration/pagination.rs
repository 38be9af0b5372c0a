use crate::error::{OrchestratorError, Result};
use serde::{Deserialize, Serialize};

/// Page metadata returned alongside a page of items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

/// Slice `items` to 1-based `page` of `per_page` entries.
///
/// A page past the end yields no items but still reports the totals.
pub fn paginate<T>(items: Vec<T>, page: usize, per_page: usize) -> Result<(Vec<T>, Pagination)> {
    if page == 0 {
        return Err(OrchestratorError::InvalidPagination(
            "page must be at least 1".to_string(),
        ));
    }
    if per_page == 0 {
        return Err(OrchestratorError::InvalidPagination(
            "per_page must be at least 1".to_string(),
        ));
    }

    let total_items = items.len();
    let start = (page - 1).saturating_mul(per_page);
    let end = start.saturating_add(per_page);
    let slice: Vec<T> = items.into_iter().skip(start).take(per_page).collect();

    Ok((
        slice,
        Pagination {
            current_page: page,
            per_page,
            total_items,
            total_pages: total_items.div_ceil(per_page),
            has_next: end < total_items,
            has_prev: page > 1,
        },
    ))
}
