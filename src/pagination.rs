//! This modules defines the common functionality for paging data.

use serde::Serialize;

/// The config for pagination
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The number of items in each page, i.e. `paginationPageSize`.
    pub page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            page_size: 10,
        }
    }
}

/// Metadata describing where a page sits in the full result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData {
    /// The requested page number, starting at 1.
    pub page: u64,
    /// The maximum number of items in a page.
    pub limit: u64,
    /// The number of pages needed to show every match, at least 1.
    pub total_pages: u64,
    /// Whether a page after this one exists.
    pub has_next_pages: bool,
}

/// A single page of items.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// The items on the page, at most `page_data.limit` of them.
    pub items: Vec<T>,
    /// Where the page sits in the full result set.
    pub page_data: PageData,
}

/// Slice `items` into the page numbered `page` (starting at 1) of `page_size` items.
///
/// `total_pages` is never less than 1, even with no items. Pages past the end
/// are empty. A `page_size` of zero is treated as one.
pub fn paginate<T>(items: Vec<T>, page: u64, page_size: u64) -> Page<T> {
    let page_size = page_size.max(1);
    let total_pages = (items.len() as u64).div_ceil(page_size).max(1);
    let offset = page.saturating_sub(1).saturating_mul(page_size);

    let items = items
        .into_iter()
        .skip(usize::try_from(offset).unwrap_or(usize::MAX))
        .take(usize::try_from(page_size).unwrap_or(usize::MAX))
        .collect();

    Page {
        items,
        page_data: PageData {
            page,
            limit: page_size,
            total_pages,
            has_next_pages: page < total_pages,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{PageData, paginate};

    #[test]
    fn twenty_five_items_split_into_three_pages() {
        let items: Vec<u32> = (1..=25).collect();

        let pages: Vec<_> = (1..=3).map(|page| paginate(items.clone(), page, 10)).collect();

        assert_eq!(pages[0].items, (1..=10).collect::<Vec<_>>());
        assert_eq!(pages[1].items, (11..=20).collect::<Vec<_>>());
        assert_eq!(pages[2].items, (21..=25).collect::<Vec<_>>());
        assert_eq!(
            pages
                .iter()
                .map(|page| page.page_data.has_next_pages)
                .collect::<Vec<_>>(),
            [true, true, false]
        );
        assert!(pages.iter().all(|page| page.page_data.total_pages == 3));
    }

    #[test]
    fn empty_result_has_one_page() {
        let page = paginate(Vec::<u32>::new(), 1, 10);

        assert!(page.items.is_empty());
        assert_eq!(
            page.page_data,
            PageData {
                page: 1,
                limit: 10,
                total_pages: 1,
                has_next_pages: false,
            }
        );
    }

    #[test]
    fn page_past_the_end_is_empty_and_keeps_requested_page() {
        let page = paginate((1..=5).collect::<Vec<u32>>(), 4, 10);

        assert!(page.items.is_empty());
        assert_eq!(page.page_data.page, 4);
        assert_eq!(page.page_data.total_pages, 1);
        assert!(!page.page_data.has_next_pages);
    }

    #[test]
    fn exact_multiple_has_no_trailing_page() {
        let items: Vec<u32> = (1..=20).collect();

        let last = paginate(items, 2, 10);

        assert_eq!(last.items.len(), 10);
        assert_eq!(last.page_data.total_pages, 2);
        assert!(!last.page_data.has_next_pages);
    }

    #[test]
    fn huge_page_number_does_not_overflow() {
        let page = paginate((1..=5).collect::<Vec<u32>>(), u64::MAX, 10);

        assert!(page.items.is_empty());
        assert!(!page.page_data.has_next_pages);
    }

    #[test]
    fn serializes_camel_case() {
        let page = paginate((1..=11).collect::<Vec<u32>>(), 1, 10);

        let json = serde_json::to_value(page.page_data).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"page": 1, "limit": 10, "totalPages": 2, "hasNextPages": true})
        );
    }
}
