// src/services/circulation.rs

//! Issue and return workflow.
//!
//! A borrow inserts a `Borrowed` transaction and marks the book unavailable.
//! A return closes the most recent open transaction of the book in place and
//! marks the book available again. Each step is an independent storage call;
//! nothing is rolled back if a later step fails.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;
use crate::error::{AppError, Result};
use crate::models::{
    Book, BookPatch, DEFAULT_RETURN_DAYS, LibrarySettings, NewStudent, NewTransaction, Student,
    Transaction, TransactionPatch, TransactionStatus,
};
use crate::storage::LibraryStorage;

/// Service recording borrows, returns and remarks.
pub struct CirculationService {
    storage: Arc<dyn LibraryStorage>,
    clock: Arc<dyn Clock>,
    fallback_days: u32,
}

impl CirculationService {
    pub fn new(storage: Arc<dyn LibraryStorage>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            fallback_days: DEFAULT_RETURN_DAYS,
        }
    }

    /// Return period used when no settings row exists.
    pub fn with_fallback_days(mut self, days: u32) -> Self {
        self.fallback_days = days;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Current return period in days.
    ///
    /// Reads the settings row; a missing row or a failed read falls back to
    /// the configured default.
    pub async fn return_period(&self) -> u32 {
        match self.storage.load_settings().await {
            Ok(Some(settings)) => settings.default_return_days,
            Ok(None) => self.fallback_days,
            Err(e) => {
                log::warn!("Failed to read settings, using {} days: {e}", self.fallback_days);
                self.fallback_days
            }
        }
    }

    /// Store a new return period (1 to 365 days).
    pub async fn update_return_period(&self, days: u32) -> Result<LibrarySettings> {
        let settings = LibrarySettings::with_return_days(days)?;
        self.storage.save_settings(&settings).await?;
        log::info!("Default return period set to {days} days");
        Ok(settings)
    }

    /// Borrow a book for the configured return period.
    pub async fn borrow(&self, book_id: &str, student_id: &str) -> Result<Transaction> {
        let now = self.now();
        let due = now + Duration::days(i64::from(self.return_period().await));
        self.record_borrow(book_id, student_id, now, due, None).await
    }

    /// Borrow a book with an explicit due date.
    pub async fn borrow_until(
        &self,
        book_id: &str,
        student_id: &str,
        due_date: DateTime<Utc>,
    ) -> Result<Transaction> {
        let now = self.now();
        self.record_borrow(book_id, student_id, now, due_date, None)
            .await
    }

    /// Issue a book to a staff member, creating their borrower record on first use.
    pub async fn issue_to_staff(
        &self,
        book_id: &str,
        staff_id: &str,
        staff_name: &str,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Transaction> {
        let (staff_id, staff_name) = (staff_id.trim(), staff_name.trim());
        if staff_id.is_empty() || staff_name.is_empty() {
            return Err(AppError::validation("staff id and name are required"));
        }

        let staff = self.staff_member(staff_id, staff_name).await?;
        let now = self.now();
        let due = match due_date {
            Some(due) => due,
            None => now + Duration::days(i64::from(self.return_period().await)),
        };
        let remarks = format!("Issued to staff member: {staff_name} ({staff_id})");
        self.record_borrow(book_id, &staff.id, now, due, Some(remarks))
            .await
    }

    async fn staff_member(&self, staff_id: &str, staff_name: &str) -> Result<Student> {
        if let Some(existing) = self.storage.find_student_by_reg(staff_id).await? {
            return Ok(existing);
        }
        log::info!("Creating staff borrower record for {staff_id}");
        self.storage
            .insert_student(&NewStudent::staff(staff_id, staff_name))
            .await
    }

    async fn record_borrow(
        &self,
        book_id: &str,
        student_id: &str,
        now: DateTime<Utc>,
        due_date: DateTime<Utc>,
        remarks: Option<String>,
    ) -> Result<Transaction> {
        if due_date <= now {
            return Err(AppError::validation("due date must be in the future"));
        }

        let book = self
            .storage
            .get_book(book_id)
            .await?
            .ok_or_else(|| AppError::not_found("Book", book_id))?;
        if !book.is_available {
            return Err(AppError::BookUnavailable(book.isbn));
        }
        if self.storage.get_student(student_id).await?.is_none() {
            return Err(AppError::not_found("Student", student_id));
        }

        let tx = self
            .storage
            .insert_transaction(&NewTransaction {
                book_id: book.id.clone(),
                student_id: student_id.to_string(),
                borrowed_date: now,
                due_date,
                return_date: None,
                status: TransactionStatus::Borrowed,
                remarks,
            })
            .await?;
        self.storage
            .update_book(&book.id, &BookPatch::availability(false))
            .await?;

        log::info!("Issued {} to {student_id}, due {}", book.isbn, due_date.date_naive());
        Ok(tx)
    }

    /// Close the latest open borrow of a book.
    pub async fn return_book(&self, book_id: &str) -> Result<Transaction> {
        self.close_borrow(book_id, TransactionPatch::returned(self.now()))
            .await
    }

    /// Return a staff loan, noting who processed it.
    pub async fn return_from_staff(&self, book_id: &str, processed_by: &str) -> Result<Transaction> {
        let now = self.now();
        let patch = TransactionPatch {
            remarks: Some(format!(
                "Returned by staff member (processed by {processed_by})"
            )),
            remarks_date: Some(now),
            remarks_by: Some(processed_by.to_string()),
            ..TransactionPatch::returned(now)
        };
        self.close_borrow(book_id, patch).await
    }

    async fn close_borrow(&self, book_id: &str, patch: TransactionPatch) -> Result<Transaction> {
        let open = self.storage.open_transactions_for_book(book_id).await?;
        let latest = open
            .into_iter()
            .max_by_key(|t| t.borrowed_date)
            .ok_or_else(|| AppError::NoActiveBorrow(book_id.to_string()))?;

        let closed = self.storage.update_transaction(&latest.id, &patch).await?;
        self.storage
            .update_book(book_id, &BookPatch::availability(true))
            .await?;

        log::info!("Returned book {book_id} (transaction {})", closed.id);
        Ok(closed)
    }

    /// Attach staff remarks to a transaction. Status is left untouched.
    pub async fn add_remarks(&self, transaction_id: &str, remarks: &str, actor: &str) -> Result<Transaction> {
        let remarks = remarks.trim();
        if remarks.is_empty() {
            return Err(AppError::validation("remarks cannot be empty"));
        }
        if self.storage.get_transaction(transaction_id).await?.is_none() {
            return Err(AppError::not_found("Transaction", transaction_id));
        }

        let patch = TransactionPatch::remarks(remarks, actor, self.now());
        self.storage.update_transaction(transaction_id, &patch).await
    }
}

/// Books whose `is_available` flag disagrees with their open transactions.
pub fn availability_mismatches<'a>(books: &'a [Book], transactions: &[Transaction]) -> Vec<&'a Book> {
    let out: HashSet<&str> = transactions
        .iter()
        .filter(|t| t.is_open())
        .map(|t| t.book_id.as_str())
        .collect();
    books
        .iter()
        .filter(|b| b.is_available == out.contains(b.id.as_str()))
        .collect()
}

/// Whether every book is unavailable exactly when it has an open borrow.
pub fn availability_consistent(books: &[Book], transactions: &[Transaction]) -> bool {
    availability_mismatches(books, transactions).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::models::NewBook;
    use crate::storage::LocalStorage;
    use chrono::TimeZone;
    use tempfile::TempDir;

    struct Desk {
        _tmp: TempDir,
        storage: Arc<LocalStorage>,
        clock: Arc<FixedClock>,
        service: CirculationService,
        /// A registered borrower
        student: String,
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    async fn desk() -> Desk {
        let tmp = TempDir::new().unwrap();
        let storage = Arc::new(LocalStorage::new(tmp.path()));
        let clock = Arc::new(FixedClock::new(start()));
        let service = CirculationService::new(storage.clone(), clock.clone());
        let student = storage
            .insert_student(&NewStudent {
                reg_number: "R1".into(),
                name: Some("Asha".into()),
                ..NewStudent::default()
            })
            .await
            .unwrap();
        Desk {
            _tmp: tmp,
            storage,
            clock,
            service,
            student: student.id,
        }
    }

    async fn audit(desk: &Desk) -> bool {
        let books = desk.storage.list_books().await.unwrap();
        let txs = desk.storage.list_transactions().await.unwrap();
        availability_consistent(&books, &txs)
    }

    #[tokio::test]
    async fn test_borrow_then_second_borrow_fails() {
        let desk = desk().await;
        let book = desk.storage.insert_book(&NewBook::new("A1", "X", "Y")).await.unwrap();

        let tx = desk.service.borrow(&book.id, &desk.student).await.unwrap();
        assert_eq!(tx.status, TransactionStatus::Borrowed);
        assert_eq!(tx.due_date, start() + Duration::days(15));
        assert!(tx.return_date.is_none());

        let stored = desk.storage.get_book(&book.id).await.unwrap().unwrap();
        assert!(!stored.is_available);
        assert!(audit(&desk).await);

        let err = desk.service.borrow(&book.id, &desk.student).await.unwrap_err();
        assert!(matches!(err, AppError::BookUnavailable(ref isbn) if isbn == "A1"));
    }

    #[tokio::test]
    async fn test_settings_row_sets_period() {
        let desk = desk().await;
        desk.service.update_return_period(21).await.unwrap();
        let book = desk.storage.insert_book(&NewBook::new("A1", "X", "Y")).await.unwrap();

        let tx = desk.service.borrow(&book.id, &desk.student).await.unwrap();
        assert_eq!(tx.due_date, start() + Duration::days(21));
        assert!(desk.service.update_return_period(0).await.is_err());
    }

    #[tokio::test]
    async fn test_return_mutates_open_row() {
        let desk = desk().await;
        let book = desk.storage.insert_book(&NewBook::new("A1", "X", "Y")).await.unwrap();
        let borrowed = desk.service.borrow(&book.id, &desk.student).await.unwrap();

        desk.clock.advance(Duration::days(3));
        let returned = desk.service.return_book(&book.id).await.unwrap();

        assert_eq!(returned.id, borrowed.id);
        assert_eq!(returned.status, TransactionStatus::Returned);
        assert_eq!(returned.borrowed_date, borrowed.borrowed_date);
        assert_eq!(returned.due_date, borrowed.due_date);
        assert_eq!(returned.return_date, Some(start() + Duration::days(3)));

        assert_eq!(desk.storage.list_transactions().await.unwrap().len(), 1);
        assert!(desk.storage.get_book(&book.id).await.unwrap().unwrap().is_available);
        assert!(audit(&desk).await);

        let err = desk.service.return_book(&book.id).await.unwrap_err();
        assert!(matches!(err, AppError::NoActiveBorrow(_)));
    }

    #[tokio::test]
    async fn test_overdue_changes_with_clock_only() {
        let desk = desk().await;
        let book = desk.storage.insert_book(&NewBook::new("A1", "X", "Y")).await.unwrap();
        let tx = desk.service.borrow(&book.id, &desk.student).await.unwrap();

        assert!(!tx.is_overdue(desk.service.now()));
        desk.clock.advance(Duration::days(16));
        assert!(tx.is_overdue(desk.service.now()));
        assert_eq!(tx.days_overdue(desk.service.now()), 1);
    }

    #[tokio::test]
    async fn test_staff_issue_reuses_record() {
        let desk = desk().await;
        let first = desk.storage.insert_book(&NewBook::new("A1", "X", "Y")).await.unwrap();
        let second = desk.storage.insert_book(&NewBook::new("A2", "X", "Y")).await.unwrap();

        let tx = desk
            .service
            .issue_to_staff(&first.id, "EMP7", "Ravi", None)
            .await
            .unwrap();
        assert_eq!(tx.remarks.as_deref(), Some("Issued to staff member: Ravi (EMP7)"));

        let due = start() + Duration::days(60);
        let tx2 = desk
            .service
            .issue_to_staff(&second.id, "EMP7", "Ravi", Some(due))
            .await
            .unwrap();
        assert_eq!(tx2.due_date, due);
        assert_eq!(tx.student_id, tx2.student_id);

        let staff: Vec<_> = desk
            .storage
            .list_students()
            .await
            .unwrap()
            .into_iter()
            .filter(|s| s.is_staff())
            .collect();
        assert_eq!(staff.len(), 1);
        assert_eq!(staff[0].id, tx.student_id);

        let closed = desk.service.return_from_staff(&first.id, "desk@lib").await.unwrap();
        assert_eq!(closed.status, TransactionStatus::Returned);
        assert_eq!(closed.remarks_by.as_deref(), Some("desk@lib"));
    }

    #[tokio::test]
    async fn test_remarks_keep_status() {
        let desk = desk().await;
        let book = desk.storage.insert_book(&NewBook::new("A1", "X", "Y")).await.unwrap();
        let tx = desk.service.borrow(&book.id, &desk.student).await.unwrap();

        assert!(desk.service.add_remarks(&tx.id, "  ", "desk").await.is_err());
        assert!(matches!(
            desk.service.add_remarks("missing", "note", "desk").await,
            Err(AppError::NotFound { .. })
        ));

        let noted = desk.service.add_remarks(&tx.id, "called parent", "desk").await.unwrap();
        assert_eq!(noted.status, TransactionStatus::Borrowed);
        assert_eq!(noted.remarks.as_deref(), Some("called parent"));
        assert_eq!(noted.remarks_date, Some(start()));
        assert_eq!(noted.remarks_by.as_deref(), Some("desk"));
    }

    #[tokio::test]
    async fn test_unknown_student_leaves_book_available() {
        let desk = desk().await;
        let book = desk.storage.insert_book(&NewBook::new("A1", "X", "Y")).await.unwrap();

        let err = desk.service.borrow(&book.id, "no-such-student").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { ref kind, .. } if kind == "Student"));
        assert!(desk.storage.get_book(&book.id).await.unwrap().unwrap().is_available);
        assert!(desk.storage.list_transactions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_book() {
        let desk = desk().await;
        assert!(matches!(
            desk.service.borrow("nope", &desk.student).await,
            Err(AppError::NotFound { .. })
        ));
    }
}
