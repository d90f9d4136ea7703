// src/models/mod.rs

//! Domain models for the library desk.
//!
//! This module contains the three core records (books, students,
//! transactions), the settings row, and application configuration.

mod book;
mod config;
mod settings;
mod student;
mod transaction;

// Re-export all public types
pub use book::{Book, BookPatch, NewBook};
pub use config::{
    BackendConfig, CacheConfig, Config, ENV_ANON_KEY, ENV_BACKEND_URL, LibraryConfig,
    PAGE_SIZE_CHOICES, SessionConfig,
};
pub use settings::{DEFAULT_RETURN_DAYS, LibrarySettings, RETURN_DAYS_RANGE};
pub use student::{NewStudent, STAFF_DEPARTMENT, Student, StudentPatch, StudentStatus};
pub use transaction::{
    DerivedStatus, NewTransaction, Transaction, TransactionPatch, TransactionStatus, is_overdue,
};
