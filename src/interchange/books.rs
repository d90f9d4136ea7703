//! Book CSV import preview and export.

use std::collections::HashSet;
use std::fmt;

use crate::interchange::{data_rows, write_row};
use crate::models::{Book, NewBook};

/// Columns of the book export, also accepted by the importer.
pub const BOOK_HEADERS: [&str; 4] = ["ISBN", "Name", "Author", "Available"];

const MSG_DUPLICATE: &str = "Access Number already exists";
const MSG_MISSING: &str = "Missing required fields";

/// Classification of one import row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStatus {
    Valid,
    Duplicate,
    Invalid,
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImportStatus::Valid => "valid",
            ImportStatus::Duplicate => "duplicate",
            ImportStatus::Invalid => "invalid",
        })
    }
}

/// One candidate book from an import file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    /// 1-based line number in the file, header included
    pub line: usize,
    pub isbn: String,
    pub name: String,
    pub author: String,
    pub is_available: bool,
    pub status: ImportStatus,
    pub message: Option<&'static str>,
}

impl ImportRecord {
    pub fn to_new_book(&self) -> NewBook {
        NewBook {
            is_available: self.is_available,
            ..NewBook::new(&self.isbn, &self.name, &self.author)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportCounts {
    pub valid: usize,
    pub duplicate: usize,
    pub invalid: usize,
}

/// Classified rows of an import file, shown before anything is written.
#[derive(Debug, Clone, Default)]
pub struct ImportPreview {
    pub records: Vec<ImportRecord>,
}

impl ImportPreview {
    /// Rows that a confirmed import will insert.
    pub fn valid(&self) -> impl Iterator<Item = &ImportRecord> {
        self.records
            .iter()
            .filter(|r| r.status == ImportStatus::Valid)
    }

    pub fn counts(&self) -> ImportCounts {
        self.records
            .iter()
            .fold(ImportCounts::default(), |mut acc, r| {
                match r.status {
                    ImportStatus::Valid => acc.valid += 1,
                    ImportStatus::Duplicate => acc.duplicate += 1,
                    ImportStatus::Invalid => acc.invalid += 1,
                }
                acc
            })
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Read the `Available` column. Only an explicit "no" marks a copy as out.
pub fn parse_available(value: &str) -> bool {
    !matches!(
        value.trim().to_lowercase().as_str(),
        "no" | "n" | "false" | "0"
    )
}

/// Parse and classify a book import file against the current catalog.
///
/// Columns are positional: access number, name, author, available. Rows
/// with fewer than four fields are dropped. Any fields between the name
/// and the last column are joined back with commas to form the author, so
/// unquoted authors such as `Klabnik, Steve` survive. Classification order:
/// an access number already in the catalog (or earlier in the file) is a
/// duplicate, then a row with an empty column is invalid, else valid.
pub fn preview_books(text: &str, existing: &[Book]) -> ImportPreview {
    let known: HashSet<&str> = existing.iter().map(|b| b.isbn.as_str()).collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut records = Vec::new();

    for (index, fields) in data_rows(text).into_iter().enumerate() {
        if fields.len() < 4 {
            log::debug!("Skipping short import row {}", index + 2);
            continue;
        }

        let isbn = fields[0].clone();
        let name = fields[1].clone();
        let author = fields[2..fields.len() - 1].join(",");
        let available = &fields[fields.len() - 1];

        let (status, message) = if !isbn.is_empty()
            && (known.contains(isbn.as_str()) || seen.contains(&isbn))
        {
            (ImportStatus::Duplicate, Some(MSG_DUPLICATE))
        } else if isbn.is_empty() || name.is_empty() || author.is_empty() || available.is_empty() {
            (ImportStatus::Invalid, Some(MSG_MISSING))
        } else {
            seen.insert(isbn.clone());
            (ImportStatus::Valid, None)
        };

        records.push(ImportRecord {
            line: index + 2,
            is_available: parse_available(available),
            isbn,
            name,
            author,
            status,
            message,
        });
    }

    ImportPreview { records }
}

/// Render the whole catalog as CSV.
pub fn export_books(books: &[Book]) -> String {
    let mut out = String::new();
    write_row(&mut out, &BOOK_HEADERS);
    for book in books {
        write_row(
            &mut out,
            &[
                book.isbn.as_str(),
                book.name.as_str(),
                book.author.as_str(),
                book.availability_label(),
            ],
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn book(isbn: &str, name: &str, author: &str, is_available: bool) -> Book {
        Book {
            id: format!("id-{isbn}"),
            isbn: isbn.into(),
            name: name.into(),
            author: author.into(),
            is_available,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_classification_order() {
        let existing = vec![book("A1", "Old", "X", true)];
        let text = "ISBN,Name,Author,Available\n\
                    A1,,Y,Yes\n\
                    B2,Name,,Yes\n\
                    C3,Rust,Klabnik,Yes\n\
                    short,row\n";
        let preview = preview_books(text, &existing);

        assert_eq!(preview.records.len(), 3);
        assert_eq!(preview.records[0].status, ImportStatus::Duplicate);
        assert_eq!(preview.records[0].message, Some("Access Number already exists"));
        assert_eq!(preview.records[1].status, ImportStatus::Invalid);
        assert_eq!(preview.records[1].message, Some("Missing required fields"));
        assert_eq!(preview.records[2].status, ImportStatus::Valid);
        assert_eq!(
            preview.counts(),
            ImportCounts {
                valid: 1,
                duplicate: 1,
                invalid: 1
            }
        );
    }

    #[test]
    fn test_author_with_commas() {
        let text = "ISBN,Name,Author,Available\n\
                    A1,Rust,Klabnik, Steve,Yes\n\
                    A2,Go,\"Donovan, Alan\",No\n";
        let preview = preview_books(text, &[]);
        assert_eq!(preview.records[0].author, "Klabnik,Steve");
        assert_eq!(preview.records[1].author, "Donovan, Alan");
        assert!(!preview.records[1].is_available);
    }

    #[test]
    fn test_repeat_within_file_is_duplicate() {
        let text = "ISBN,Name,Author,Available\nA1,X,Y,Yes\nA1,Z,W,Yes\n";
        let preview = preview_books(text, &[]);
        assert_eq!(preview.valid().count(), 1);
        assert_eq!(preview.records[1].status, ImportStatus::Duplicate);
    }

    #[test]
    fn test_export_round_trip() {
        let books = vec![
            book("001", "The Book", "Author One", true),
            book("002", "Other", "Donovan, Alan", false),
        ];
        let csv = export_books(&books);
        assert!(csv.starts_with("ISBN,Name,Author,Available\n001,The Book,Author One,Yes\n"));

        let preview = preview_books(&csv, &[]);
        let tuples: Vec<_> = preview
            .valid()
            .map(|r| (r.isbn.as_str(), r.name.as_str(), r.author.as_str(), r.is_available))
            .collect();
        assert_eq!(
            tuples,
            vec![
                ("001", "The Book", "Author One", true),
                ("002", "Other", "Donovan, Alan", false),
            ]
        );
    }
}
