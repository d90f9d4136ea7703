//! Staff catalog listing.

use crate::models::Book;
use crate::query::SortOrder;
use crate::utils::{compare_text, contains_ci};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum BookSearchField {
    Isbn,
    #[default]
    Name,
    Author,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum AvailabilityFilter {
    #[default]
    All,
    Available,
    Borrowed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum BookSortField {
    #[default]
    Name,
    Author,
    Isbn,
}

/// Search, filter and sort settings for the catalog table.
#[derive(Debug, Clone, Default)]
pub struct BookQuery {
    pub search: String,
    pub search_field: BookSearchField,
    pub availability: AvailabilityFilter,
    pub sort_by: BookSortField,
    pub order: SortOrder,
}

impl BookQuery {
    pub fn matches(&self, book: &Book) -> bool {
        let field = match self.search_field {
            BookSearchField::Isbn => &book.isbn,
            BookSearchField::Name => &book.name,
            BookSearchField::Author => &book.author,
        };
        let availability = match self.availability {
            AvailabilityFilter::All => true,
            AvailabilityFilter::Available => book.is_available,
            AvailabilityFilter::Borrowed => !book.is_available,
        };
        availability && contains_ci(field, &self.search)
    }

    /// Filtered and sorted view of `books`.
    pub fn apply<'a>(&self, books: &'a [Book]) -> Vec<&'a Book> {
        let mut view: Vec<&Book> = books.iter().filter(|b| self.matches(b)).collect();
        view.sort_by(|a, b| {
            let ordering = match self.sort_by {
                BookSortField::Name => compare_text(&a.name, &b.name),
                BookSortField::Author => compare_text(&a.author, &b.author),
                BookSortField::Isbn => compare_text(&a.isbn, &b.isbn),
            };
            self.order.apply(ordering)
        });
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(isbn: &str, name: &str, author: &str, is_available: bool) -> Book {
        serde_json::from_value(serde_json::json!({
            "id": isbn, "isbn": isbn, "name": name, "author": author, "is_available": is_available
        }))
        .unwrap()
    }

    fn catalog() -> Vec<Book> {
        vec![
            book("003", "rust in action", "McNamara", true),
            book("001", "Programming Rust", "Blandy", false),
            book("002", "Go", "Donovan", true),
        ]
    }

    #[test]
    fn test_search_selected_field_only() {
        let books = catalog();
        let query = BookQuery {
            search: "RUST".into(),
            ..BookQuery::default()
        };
        assert_eq!(query.apply(&books).len(), 2);

        let query = BookQuery {
            search: "rust".into(),
            search_field: BookSearchField::Author,
            ..BookQuery::default()
        };
        assert!(query.apply(&books).is_empty());
    }

    #[test]
    fn test_availability_and_sort() {
        let books = catalog();
        let query = BookQuery {
            availability: AvailabilityFilter::Available,
            sort_by: BookSortField::Isbn,
            order: SortOrder::Desc,
            ..BookQuery::default()
        };
        let isbns: Vec<&str> = query.apply(&books).iter().map(|b| b.isbn.as_str()).collect();
        assert_eq!(isbns, vec!["003", "002"]);
    }

    #[test]
    fn test_case_folded_name_sort() {
        let books = catalog();
        let names: Vec<&str> = BookQuery::default()
            .apply(&books)
            .iter()
            .map(|b| b.name.as_str())
            .collect();
        assert_eq!(names, vec!["Go", "Programming Rust", "rust in action"]);
    }
}
