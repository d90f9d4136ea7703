//! In-memory listing transforms: filter, sort, paginate and group.
//!
//! Every transform works on a full collection already fetched from storage
//! and returns borrowed views, so the same snapshot can back several
//! listings.

mod books;
mod catalog;
mod students;
mod transactions;

use std::cmp::Ordering;

use crate::error::{AppError, Result};
use crate::models::PAGE_SIZE_CHOICES;

pub use books::{AvailabilityFilter, BookQuery, BookSearchField, BookSortField};
pub use catalog::{BookGroup, GroupQuery, GroupSearchField, GroupSortField, group_books};
pub use students::{StudentQuery, StudentSearchField, StudentSortField, StudentStatusFilter};
pub use transactions::{
    DateFilter, TransactionQuery, TransactionSortField, TransactionStatusFilter,
    TransactionTotals, overdue_matching, totals,
};

/// Explicit sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Orient an ascending comparison.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page actually served after clamping
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

impl<T> Page<T> {
    /// 1-based index of the first item shown, 0 for an empty listing.
    pub fn first_index(&self) -> usize {
        if self.items.is_empty() {
            0
        } else {
            (self.page - 1) * self.page_size + 1
        }
    }

    /// 1-based index of the last item shown.
    pub fn last_index(&self) -> usize {
        (self.page - 1) * self.page_size + self.items.len()
    }
}

/// Accept only the offered page sizes.
pub fn check_page_size(page_size: usize) -> Result<usize> {
    if PAGE_SIZE_CHOICES.contains(&page_size) {
        Ok(page_size)
    } else {
        Err(AppError::validation(format!(
            "page size must be one of {PAGE_SIZE_CHOICES:?}, got {page_size}"
        )))
    }
}

/// Parse a page size typed by the user.
pub fn parse_page_size(text: &str) -> Result<usize> {
    let page_size = text
        .trim()
        .parse()
        .map_err(|_| AppError::validation(format!("page size is not a number: '{text}'")))?;
    check_page_size(page_size)
}

/// Cut one page out of `items`, clamping `page` into `[1, max(total_pages, 1)]`.
/// Fails when `page_size` is not one of the offered choices.
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Result<Page<T>> {
    let page_size = check_page_size(page_size)?;
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size);
    let page = page.clamp(1, total_pages.max(1));

    let items = items
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    Ok(Page {
        items,
        page,
        page_size,
        total_pages,
        total_items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_page_holds_remainder() {
        let page = paginate((1..=10).collect(), 2, 9).unwrap();
        assert_eq!(page.items, vec![10]);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.first_index(), 10);
        assert_eq!(page.last_index(), 10);
    }

    #[test]
    fn test_page_is_clamped() {
        let page = paginate((1..=10).collect(), 99, 9).unwrap();
        assert_eq!(page.page, 2);
        assert_eq!(page.items, vec![10]);

        let page = paginate((1..=10).collect::<Vec<_>>(), 0, 9).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.items.len(), 9);
    }

    #[test]
    fn test_empty_listing() {
        let page = paginate(Vec::<u8>::new(), 3, 9).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 0);
        assert!(page.items.is_empty());
        assert_eq!(page.first_index(), 0);
    }

    #[test]
    fn test_page_size_limited_to_choices() {
        let page = paginate((1..=40).collect::<Vec<_>>(), 2, 36).unwrap();
        assert_eq!(page.items, vec![37, 38, 39, 40]);

        for size in [0, 1, 10, 100] {
            assert!(matches!(
                paginate((1..=40).collect::<Vec<_>>(), 1, size),
                Err(AppError::Validation(_))
            ));
        }

        assert_eq!(parse_page_size(" 18 ").unwrap(), 18);
        assert!(parse_page_size("10").is_err());
        assert!(parse_page_size("nine").is_err());
    }

    #[test]
    fn test_sort_order() {
        assert_eq!(SortOrder::Desc.apply(1.cmp(&2)), Ordering::Greater);
        assert_eq!(SortOrder::Asc.apply(1.cmp(&2)), Ordering::Less);
    }
}
