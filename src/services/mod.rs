//! Service layer for the library desk.
//!
//! This module contains the business logic for:
//! - Issue and return (`CirculationService`)
//! - Catalog maintenance and import (`CatalogService`)
//! - Roster maintenance and import (`RosterService`)
//! - Availability lookup (`LookupService`)
//! - Dashboard figures and reminder links, computed from a `Snapshot`

mod catalog;
mod circulation;
mod dashboard;
mod lookup;
mod notify;
mod roster;

use crate::error::Result;
use crate::models::{Book, Student, Transaction};
use crate::storage::LibraryStorage;

pub use catalog::{BulkOutcome, CatalogService};
pub use circulation::{CirculationService, availability_consistent, availability_mismatches};
pub use dashboard::{ACTIVITY_MONTHS, DashboardStats, MonthlyActivity, dashboard_stats};
pub use lookup::{
    Availability, LookupHit, LookupReply, LookupService, NO_MATCH_MESSAGE, PROMPT_MESSAGE,
};
pub use notify::{
    Reminder, ReminderKind, build_reminders, overdue, reminder_message, upcoming_due,
    upcoming_returns, whatsapp_link,
};
pub use roster::{ImportSummary, RosterService, RosterStats};

/// All three collections read together.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub books: Vec<Book>,
    pub students: Vec<Student>,
    pub transactions: Vec<Transaction>,
}

/// Read every collection concurrently.
pub async fn load_snapshot(storage: &dyn LibraryStorage) -> Result<Snapshot> {
    let (books, students, transactions) = futures::try_join!(
        storage.list_books(),
        storage.list_students(),
        storage.list_transactions()
    )?;
    log::debug!(
        "Loaded {} books, {} students, {} transactions",
        books.len(),
        students.len(),
        transactions.len()
    );
    Ok(Snapshot {
        books,
        students,
        transactions,
    })
}
