// src/services/lookup.rs

//! Availability lookup for the public help widget.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::clock::Clock;
use crate::error::Result;
use crate::storage::LibraryStorage;
use crate::utils::contains_ci;

pub const PROMPT_MESSAGE: &str = "Please enter a valid book title or access number.";
pub const NO_MATCH_MESSAGE: &str =
    "No books found matching your search. Please try with a different title or access number.";

/// Where a copy currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    /// Out; the due date is unknown when no open transaction was found
    Borrowed { due: Option<DateTime<Utc>> },
    Overdue { due: DateTime<Utc> },
}

/// One matching copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupHit {
    pub book_name: String,
    pub isbn: String,
    pub availability: Availability,
}

impl fmt::Display for LookupHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.availability {
            Availability::Available => {
                write!(f, "\"{}\" is currently available for Borrow.", self.book_name)
            }
            Availability::Borrowed { due: Some(due) } => write!(
                f,
                "\"{}\" is currently borrowed. Due {}.",
                self.book_name,
                due.format("%Y-%m-%d")
            ),
            Availability::Borrowed { due: None } => {
                write!(f, "\"{}\" is currently borrowed.", self.book_name)
            }
            Availability::Overdue { due } => write!(
                f,
                "\"{}\" is currently borrowed and overdue. Was due {}.",
                self.book_name,
                due.format("%Y-%m-%d")
            ),
        }
    }
}

/// Reply to one lookup query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupReply {
    /// The query was blank
    Prompt,
    NoMatch,
    Hits(Vec<LookupHit>),
}

impl LookupReply {
    /// Text shown for replies that carry no hits.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            LookupReply::Prompt => Some(PROMPT_MESSAGE),
            LookupReply::NoMatch => Some(NO_MATCH_MESSAGE),
            LookupReply::Hits(_) => None,
        }
    }
}

/// Service answering "is this book in?" questions.
pub struct LookupService {
    storage: Arc<dyn LibraryStorage>,
    clock: Arc<dyn Clock>,
    limit: usize,
}

impl LookupService {
    pub fn new(storage: Arc<dyn LibraryStorage>, clock: Arc<dyn Clock>, limit: usize) -> Self {
        Self {
            storage,
            clock,
            limit: limit.max(1),
        }
    }

    /// Match books whose name or access number contains `query`.
    pub async fn lookup(&self, query: &str) -> Result<LookupReply> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(LookupReply::Prompt);
        }

        let books = self.storage.list_books().await?;
        let matches: Vec<_> = books
            .into_iter()
            .filter(|b| contains_ci(&b.name, query) || contains_ci(&b.isbn, query))
            .take(self.limit)
            .collect();
        if matches.is_empty() {
            return Ok(LookupReply::NoMatch);
        }

        let now = self.clock.now();
        let mut hits = Vec::with_capacity(matches.len());
        for book in matches {
            let availability = if book.is_available {
                Availability::Available
            } else {
                let open = self.storage.open_transactions_for_book(&book.id).await?;
                match open.into_iter().max_by_key(|t| t.borrowed_date) {
                    Some(tx) if tx.is_overdue(now) => Availability::Overdue { due: tx.due_date },
                    Some(tx) => Availability::Borrowed {
                        due: Some(tx.due_date),
                    },
                    None => Availability::Borrowed { due: None },
                }
            };
            hits.push(LookupHit {
                book_name: book.name,
                isbn: book.isbn,
                availability,
            });
        }
        Ok(LookupReply::Hits(hits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::models::{NewBook, NewStudent};
    use crate::services::CirculationService;
    use crate::storage::LocalStorage;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_lookup_states() {
        let tmp = TempDir::new().unwrap();
        let storage = Arc::new(LocalStorage::new(tmp.path()));
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()));
        let circulation = CirculationService::new(storage.clone(), clock.clone());
        let lookup = LookupService::new(storage.clone(), clock.clone(), 5);

        let rust = storage.insert_book(&NewBook::new("A1", "Rust", "K")).await.unwrap();
        storage.insert_book(&NewBook::new("A2", "Rust Atomics", "Bos")).await.unwrap();
        let reader = storage
            .insert_student(&NewStudent {
                reg_number: "R1".into(),
                ..NewStudent::default()
            })
            .await
            .unwrap();
        circulation.borrow(&rust.id, &reader.id).await.unwrap();

        assert_eq!(lookup.lookup("  ").await.unwrap(), LookupReply::Prompt);
        assert_eq!(lookup.lookup("haskell").await.unwrap(), LookupReply::NoMatch);

        let LookupReply::Hits(hits) = lookup.lookup("rust").await.unwrap() else {
            panic!("expected hits");
        };
        assert_eq!(hits.len(), 2);
        let out = hits.iter().find(|h| h.isbn == "A1").unwrap();
        assert!(matches!(out.availability, Availability::Borrowed { due: Some(_) }));

        clock.advance(Duration::days(20));
        let LookupReply::Hits(hits) = lookup.lookup("a1").await.unwrap() else {
            panic!("expected hits");
        };
        assert!(matches!(hits[0].availability, Availability::Overdue { .. }));
        assert!(hits[0].to_string().contains("overdue"));
    }

    #[tokio::test]
    async fn test_limit() {
        let tmp = TempDir::new().unwrap();
        let storage = Arc::new(LocalStorage::new(tmp.path()));
        for i in 0..7 {
            storage
                .insert_book(&NewBook::new(format!("C{i}"), "Copy", "A"))
                .await
                .unwrap();
        }
        let lookup = LookupService::new(storage, Arc::new(crate::clock::SystemClock), 5);
        let LookupReply::Hits(hits) = lookup.lookup("copy").await.unwrap() else {
            panic!("expected hits");
        };
        assert_eq!(hits.len(), 5);
    }
}
