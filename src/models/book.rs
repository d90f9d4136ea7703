// src/models/book.rs

//! Book (physical copy) records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single physical copy in the catalog.
///
/// `isbn` holds the library's access number, not a true ISBN.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Book {
    pub id: String,

    /// Access number of the physical copy
    pub isbn: String,

    pub name: String,

    pub author: String,

    pub is_available: bool,

    #[serde(default)]
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Render availability the way exports and listings show it.
    pub fn availability_label(&self) -> &'static str {
        if self.is_available { "Yes" } else { "No" }
    }
}

/// Payload for creating a book.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewBook {
    pub isbn: String,
    pub name: String,
    pub author: String,
    pub is_available: bool,
}

impl NewBook {
    /// A new copy, available for borrowing.
    pub fn new(isbn: impl Into<String>, name: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            isbn: isbn.into(),
            name: name.into(),
            author: author.into(),
            is_available: true,
        }
    }

    /// Trim all text fields.
    pub fn normalized(self) -> Self {
        Self {
            isbn: self.isbn.trim().to_string(),
            name: self.name.trim().to_string(),
            author: self.author.trim().to_string(),
            is_available: self.is_available,
        }
    }
}

/// Partial update for a book. Only `Some` fields are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_available: Option<bool>,
}

impl BookPatch {
    /// Patch that only flips availability.
    pub fn availability(is_available: bool) -> Self {
        Self {
            is_available: Some(is_available),
            ..Self::default()
        }
    }

    /// Apply this patch to a book in place.
    pub fn apply(&self, book: &mut Book) {
        if let Some(isbn) = &self.isbn {
            book.isbn = isbn.clone();
        }
        if let Some(name) = &self.name {
            book.name = name.clone();
        }
        if let Some(author) = &self.author {
            book.author = author.clone();
        }
        if let Some(is_available) = self.is_available {
            book.is_available = is_available;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_backend_row() {
        let json = r#"{
            "id": "b1",
            "isbn": "A1",
            "name": "Rust",
            "author": "Klabnik, Steve",
            "is_available": true,
            "created_at": "2025-03-12T10:00:00.123456+00:00",
            "updated_at": "2025-03-12T10:00:00+00:00"
        }"#;
        let book: Book = serde_json::from_str(json).unwrap();
        assert_eq!(book.isbn, "A1");
        assert_eq!(book.availability_label(), "Yes");
    }

    #[test]
    fn test_patch_skips_unset_fields() {
        let patch = BookPatch::availability(false);
        let json = serde_json::to_string(&patch).unwrap();
        assert_eq!(json, r#"{"is_available":false}"#);
    }
}
