//! Public catalog: copies grouped into titles.

use std::collections::HashMap;

use crate::models::Book;
use crate::query::SortOrder;
use crate::utils::{compare_text, contains_ci};

/// All copies sharing an exact `(name, author)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookGroup {
    pub name: String,
    pub author: String,
    pub count: usize,
    /// Access numbers of the copies, in catalog order
    pub isbn_list: Vec<String>,
}

/// Collapse copies into title groups, keeping first-seen order.
pub fn group_books(books: &[Book]) -> Vec<BookGroup> {
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();
    let mut groups: Vec<BookGroup> = Vec::new();

    for book in books {
        let key = (book.name.as_str(), book.author.as_str());
        match index.get(&key) {
            Some(&i) => {
                groups[i].count += 1;
                groups[i].isbn_list.push(book.isbn.clone());
            }
            None => {
                index.insert(key, groups.len());
                groups.push(BookGroup {
                    name: book.name.clone(),
                    author: book.author.clone(),
                    count: 1,
                    isbn_list: vec![book.isbn.clone()],
                });
            }
        }
    }
    groups
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum GroupSearchField {
    #[default]
    Name,
    Author,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum GroupSortField {
    #[default]
    Name,
    Author,
    Count,
}

/// Search and sort settings for the public catalog.
#[derive(Debug, Clone, Default)]
pub struct GroupQuery {
    pub search: String,
    pub search_field: GroupSearchField,
    pub sort_by: GroupSortField,
    pub order: SortOrder,
}

impl GroupQuery {
    pub fn matches(&self, group: &BookGroup) -> bool {
        match self.search_field {
            GroupSearchField::Name => contains_ci(&group.name, &self.search),
            GroupSearchField::Author => contains_ci(&group.author, &self.search),
        }
    }

    pub fn apply(&self, groups: Vec<BookGroup>) -> Vec<BookGroup> {
        let mut view: Vec<BookGroup> = groups.into_iter().filter(|g| self.matches(g)).collect();
        view.sort_by(|a, b| {
            let ordering = match self.sort_by {
                GroupSortField::Name => compare_text(&a.name, &b.name),
                GroupSortField::Author => compare_text(&a.author, &b.author),
                GroupSortField::Count => a.count.cmp(&b.count),
            };
            self.order.apply(ordering)
        });
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(isbn: &str, name: &str, author: &str) -> Book {
        serde_json::from_value(serde_json::json!({
            "id": isbn, "isbn": isbn, "name": name, "author": author, "is_available": true
        }))
        .unwrap()
    }

    #[test]
    fn test_copies_collapse_into_one_group() {
        let groups = group_books(&[book("001", "T", "A"), book("002", "T", "A")]);
        assert_eq!(
            groups,
            vec![BookGroup {
                name: "T".into(),
                author: "A".into(),
                count: 2,
                isbn_list: vec!["001".into(), "002".into()],
            }]
        );
    }

    #[test]
    fn test_grouping_key_is_exact() {
        let groups = group_books(&[book("001", "T", "A"), book("002", "t", "A"), book("003", "T", "B")]);
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn test_search_and_count_sort() {
        let groups = group_books(&[
            book("001", "Rust", "K"),
            book("002", "Go", "D"),
            book("003", "Go", "D"),
            book("004", "Rust Atomics", "Bos"),
        ]);
        let query = GroupQuery {
            sort_by: GroupSortField::Count,
            order: SortOrder::Desc,
            ..GroupQuery::default()
        };
        assert_eq!(query.apply(groups.clone())[0].name, "Go");

        let query = GroupQuery {
            search: "rust".into(),
            ..GroupQuery::default()
        };
        assert_eq!(query.apply(groups).len(), 2);
    }
}
