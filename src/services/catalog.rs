// src/services/catalog.rs

//! Catalog maintenance: add, edit, delete, bulk availability and CSV import.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::interchange::{self, ImportPreview};
use crate::models::{Book, BookPatch, NewBook};
use crate::storage::LibraryStorage;

/// Result of a bulk write that keeps going past failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub updated: usize,
    pub failed: usize,
}

/// Service for catalog maintenance.
pub struct CatalogService {
    storage: Arc<dyn LibraryStorage>,
}

impl CatalogService {
    pub fn new(storage: Arc<dyn LibraryStorage>) -> Self {
        Self { storage }
    }

    pub async fn books(&self) -> Result<Vec<Book>> {
        self.storage.list_books().await
    }

    /// Add a new, available copy.
    pub async fn add_book(&self, book: NewBook) -> Result<Book> {
        let book = NewBook {
            is_available: true,
            ..book.normalized()
        };
        require("access number", &book.isbn)?;
        require("name", &book.name)?;
        require("author", &book.author)?;
        self.ensure_unique_isbn(&book.isbn, None).await?;

        let stored = self.storage.insert_book(&book).await?;
        log::info!("Added book {} ({})", stored.isbn, stored.name);
        Ok(stored)
    }

    /// Edit text fields of a book. Availability is not edited here.
    pub async fn edit_book(&self, id: &str, patch: BookPatch) -> Result<Book> {
        let trim = |v: Option<String>| v.map(|s| s.trim().to_string());
        let patch = BookPatch {
            isbn: trim(patch.isbn),
            name: trim(patch.name),
            author: trim(patch.author),
            is_available: None,
        };
        for (label, value) in [
            ("access number", &patch.isbn),
            ("name", &patch.name),
            ("author", &patch.author),
        ] {
            if let Some(value) = value {
                require(label, value)?;
            }
        }
        if let Some(isbn) = &patch.isbn {
            self.ensure_unique_isbn(isbn, Some(id)).await?;
        }

        self.storage.update_book(id, &patch).await
    }

    /// Delete a book and its history. Books currently out cannot be deleted.
    pub async fn delete_book(&self, id: &str) -> Result<()> {
        let open = self.storage.open_transactions_for_book(id).await?;
        if !open.is_empty() {
            return Err(AppError::BookOnLoan(id.to_string()));
        }
        self.storage.delete_book(id).await?;
        log::info!("Deleted book {id}");
        Ok(())
    }

    /// Set availability on many books, one write at a time.
    ///
    /// This overrides the circulation state; failures are logged and
    /// counted, and the remaining books are still updated.
    pub async fn set_availability(&self, ids: &[String], available: bool) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for id in ids {
            match self
                .storage
                .update_book(id, &BookPatch::availability(available))
                .await
            {
                Ok(_) => outcome.updated += 1,
                Err(e) => {
                    log::warn!("Failed to update availability of {id}: {e}");
                    outcome.failed += 1;
                }
            }
        }
        outcome
    }

    /// Classify an import file against the current catalog.
    pub async fn preview_import(&self, text: &str) -> Result<ImportPreview> {
        let existing = self.storage.list_books().await?;
        Ok(interchange::preview_books(text, &existing))
    }

    /// Insert the valid rows of a preview, in order, one at a time.
    ///
    /// `progress` is called with the percentage done after each insert. A
    /// failed insert stops the import; rows already inserted stay.
    pub async fn confirm_import<F>(&self, preview: &ImportPreview, mut progress: F) -> Result<usize>
    where
        F: FnMut(f64),
    {
        let total = preview.valid().count();
        let mut imported = 0;

        for record in preview.valid() {
            if let Err(e) = self.storage.insert_book(&record.to_new_book()).await {
                log::error!("Import stopped at line {}: {e}", record.line);
                return Err(AppError::Import {
                    imported,
                    source: Box::new(e),
                });
            }
            imported += 1;
            progress(imported as f64 / total as f64 * 100.0);
        }

        log::info!("Imported {imported} book(s)");
        Ok(imported)
    }

    async fn ensure_unique_isbn(&self, isbn: &str, except_id: Option<&str>) -> Result<()> {
        let books = self.storage.list_books().await?;
        if books
            .iter()
            .any(|b| b.isbn == isbn && Some(b.id.as_str()) != except_id)
        {
            return Err(AppError::duplicate("isbn", isbn));
        }
        Ok(())
    }
}

fn require(label: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(AppError::validation(format!("{label} is required")));
    }
    Ok(())
}
