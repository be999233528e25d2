//! Page selection for list endpoints.

use serde::Deserialize;

/// Number of records per page.
pub const PAGE_SIZE: usize = 10;

/// `?page=N` query parameter.
///
/// Kept as a raw string so that non-numeric values fall back to page 1
/// instead of failing extraction.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    /// Requested page number; absent, non-numeric, or non-positive values mean 1.
    pub fn page(&self) -> usize {
        self.page
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|page| *page > 0)
            .and_then(|page| usize::try_from(page).ok())
            .unwrap_or(1)
    }
}

/// Return the `page`-th window of `PAGE_SIZE` records.
///
/// Pages are 1-based; page 0 is treated as page 1. A window starting past
/// the end yields an empty slice.
pub fn paginate<T>(records: &[T], page: usize) -> &[T] {
    let start = page.max(1).saturating_sub(1).saturating_mul(PAGE_SIZE);
    let end = start.saturating_add(PAGE_SIZE).min(records.len());

    records.get(start..end).unwrap_or(&[])
}
