//! Storage abstractions over the hosted backend.
//!
//! The backend exposes four tables:
//!
//! ```text
//! books          # physical copies, keyed by id, access number in `isbn`
//! students       # borrowers, `reg_number` unique
//! transactions   # borrow events, joined with books/students on read
//! settings       # single row holding `default_return_days`
//! ```
//!
//! `RestStorage` talks to the hosted REST gateway. `LocalStorage` keeps the
//! same tables as JSON files for offline use and tests. `CachedStorage`
//! wraps either one with a read-through cache for collection listings.

pub mod cached;
pub mod local;
pub mod rest;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    Book, BookPatch, Config, LibrarySettings, NewBook, NewStudent, NewTransaction, Student,
    StudentPatch, Transaction, TransactionPatch,
};

// Re-export for convenience
pub use cached::CachedStorage;
pub use local::LocalStorage;
pub use rest::RestStorage;

/// Trait for library storage backends.
///
/// Every call is an independent request; there are no multi-call
/// transactions, so a failure between two calls leaves the first applied.
#[async_trait]
pub trait LibraryStorage: Send + Sync {
    /// All books, newest first.
    async fn list_books(&self) -> Result<Vec<Book>>;

    async fn get_book(&self, id: &str) -> Result<Option<Book>>;

    async fn insert_book(&self, book: &NewBook) -> Result<Book>;

    async fn update_book(&self, id: &str, patch: &BookPatch) -> Result<Book>;

    /// Delete a book together with its transactions.
    async fn delete_book(&self, id: &str) -> Result<()>;

    /// All students, newest first.
    async fn list_students(&self) -> Result<Vec<Student>>;

    async fn get_student(&self, id: &str) -> Result<Option<Student>>;

    async fn find_student_by_reg(&self, reg_number: &str) -> Result<Option<Student>>;

    async fn insert_student(&self, student: &NewStudent) -> Result<Student>;

    async fn update_student(&self, id: &str, patch: &StudentPatch) -> Result<Student>;

    /// All transactions joined with their book and student, latest borrow first.
    async fn list_transactions(&self) -> Result<Vec<Transaction>>;

    /// Open (`Borrowed`) transactions of one book, latest borrow first.
    async fn open_transactions_for_book(&self, book_id: &str) -> Result<Vec<Transaction>>;

    async fn get_transaction(&self, id: &str) -> Result<Option<Transaction>>;

    async fn insert_transaction(&self, tx: &NewTransaction) -> Result<Transaction>;

    async fn update_transaction(&self, id: &str, patch: &TransactionPatch) -> Result<Transaction>;

    /// The settings row, if one has been saved.
    async fn load_settings(&self) -> Result<Option<LibrarySettings>>;

    async fn save_settings(&self, settings: &LibrarySettings) -> Result<()>;
}

/// Build the storage stack described by the configuration.
///
/// A non-empty `backend.url` selects the REST backend, otherwise the local
/// JSON tables under `backend.local_dir` are used. Listings are wrapped in the
/// read-through cache when `cache.enabled` is set.
pub fn from_config(config: &Config) -> Result<Arc<dyn LibraryStorage>> {
    let inner: Arc<dyn LibraryStorage> = if config.backend.is_remote() {
        log::info!("Using REST backend at {}", config.backend.url);
        Arc::new(RestStorage::new(&config.backend)?)
    } else {
        log::info!(
            "Using local backend in {}",
            config.backend.local_dir.display()
        );
        Arc::new(LocalStorage::new(&config.backend.local_dir))
    };

    if config.cache.enabled {
        Ok(Arc::new(CachedStorage::new(
            inner,
            crate::cache::CollectionCache::new(&config.cache.dir, config.cache.staleness()),
        )))
    } else {
        Ok(inner)
    }
}
