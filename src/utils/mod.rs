//! Project-specific utilities live here.

use std::ops::Range;

/// Index range of the requested page within `len` items.
///
/// Pages are 1-based. Out-of-range input is not an error: a negative offset
/// skips nothing, a non-positive size yields an empty page, and an offset
/// past the end yields an empty page.
pub fn page_window(len: usize, page_number: i64, page_size: i64) -> Range<usize> {
    let offset = page_number.saturating_sub(1).saturating_mul(page_size);
    let start = usize::try_from(offset.max(0)).unwrap_or(usize::MAX).min(len);
    let take = usize::try_from(page_size.max(0)).unwrap_or(usize::MAX);
    start..start.saturating_add(take).min(len)
}
