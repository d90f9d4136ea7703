// src/models/transaction.rs

//! Borrow transactions and the status derived from them at read time.
//!
//! Overdue is never stored. It is recomputed from `status`, `due_date`
//! and the caller's notion of "now" on every read.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Book, Student};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;
const MILLIS_PER_HOUR: i64 = 60 * 60 * 1000;

/// Stored transaction status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TransactionStatus {
    Borrowed,
    Returned,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Borrowed => "Borrowed",
            TransactionStatus::Returned => "Returned",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status as presented to users, including the derived overdue state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedStatus {
    Borrowed,
    Overdue,
    Returned,
}

/// One borrow event. A return mutates this row rather than adding one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub book_id: String,
    pub student_id: String,
    pub borrowed_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,

    #[serde(default)]
    pub return_date: Option<DateTime<Utc>>,

    pub status: TransactionStatus,

    #[serde(default)]
    pub remarks: Option<String>,

    #[serde(default)]
    pub remarks_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub remarks_by: Option<String>,

    #[serde(default)]
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub updated_at: DateTime<Utc>,

    /// Joined book row, present when read with the embedding select
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book: Option<Book>,

    /// Joined student row, present when read with the embedding select
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student: Option<Student>,
}

impl Transaction {
    pub fn is_open(&self) -> bool {
        self.status == TransactionStatus::Borrowed
    }

    /// `status == Borrowed && due_date < now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        is_overdue(self.status, self.due_date, now)
    }

    /// Whole days past due, rounded up. Zero or negative when not yet due.
    pub fn days_overdue(&self, now: DateTime<Utc>) -> i64 {
        ceil_div(now - self.due_date, MILLIS_PER_DAY)
    }

    /// Whole days until due, rounded up.
    pub fn days_until_due(&self, now: DateTime<Utc>) -> i64 {
        ceil_div(self.due_date - now, MILLIS_PER_DAY)
    }

    /// Whole hours until due, rounded up.
    pub fn hours_until_due(&self, now: DateTime<Utc>) -> i64 {
        ceil_div(self.due_date - now, MILLIS_PER_HOUR)
    }

    pub fn derived_status(&self, now: DateTime<Utc>) -> DerivedStatus {
        match self.status {
            TransactionStatus::Returned => DerivedStatus::Returned,
            TransactionStatus::Borrowed if self.due_date < now => DerivedStatus::Overdue,
            TransactionStatus::Borrowed => DerivedStatus::Borrowed,
        }
    }

    /// Joined book name, empty when the join is missing.
    pub fn book_name(&self) -> &str {
        self.book.as_ref().map_or("", |b| b.name.as_str())
    }

    /// Joined access number, empty when the join is missing.
    pub fn book_isbn(&self) -> &str {
        self.book.as_ref().map_or("", |b| b.isbn.as_str())
    }

    /// Joined student name, empty when the join is missing.
    pub fn student_name(&self) -> &str {
        self.student.as_ref().map_or("", |s| s.display_name())
    }

    /// Joined registration number, empty when the join is missing.
    pub fn student_reg_number(&self) -> &str {
        self.student.as_ref().map_or("", |s| s.reg_number.as_str())
    }
}

/// The overdue predicate on its own, for callers without a full row.
pub fn is_overdue(status: TransactionStatus, due_date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    status == TransactionStatus::Borrowed && due_date < now
}

fn ceil_div(delta: Duration, unit_millis: i64) -> i64 {
    let millis = delta.num_milliseconds();
    -((-millis).div_euclid(unit_millis))
}

/// Payload for creating a transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTransaction {
    pub book_id: String,
    pub student_id: String,
    pub borrowed_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: TransactionStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

/// Partial update for a transaction. Only `Some` fields are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TransactionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TransactionStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_date: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks_date: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks_by: Option<String>,
}

impl TransactionPatch {
    /// Close an open borrow. Borrowed and due dates are left untouched.
    pub fn returned(at: DateTime<Utc>) -> Self {
        Self {
            status: Some(TransactionStatus::Returned),
            return_date: Some(at),
            ..Self::default()
        }
    }

    /// Attach staff remarks stamped with actor and time.
    pub fn remarks(text: impl Into<String>, by: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            remarks: Some(text.into()),
            remarks_date: Some(at),
            remarks_by: Some(by.into()),
            ..Self::default()
        }
    }

    pub fn apply(&self, tx: &mut Transaction) {
        if let Some(status) = self.status {
            tx.status = status;
        }
        if let Some(at) = self.return_date {
            tx.return_date = Some(at);
        }
        if let Some(remarks) = &self.remarks {
            tx.remarks = Some(remarks.clone());
        }
        if let Some(at) = self.remarks_date {
            tx.remarks_date = Some(at);
        }
        if let Some(by) = &self.remarks_by {
            tx.remarks_by = Some(by.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
    }

    fn borrowed(due: DateTime<Utc>) -> Transaction {
        Transaction {
            id: "t1".into(),
            book_id: "b1".into(),
            student_id: "s1".into(),
            borrowed_date: at(1, 9),
            due_date: due,
            return_date: None,
            status: TransactionStatus::Borrowed,
            remarks: None,
            remarks_date: None,
            remarks_by: None,
            created_at: at(1, 9),
            updated_at: at(1, 9),
            book: None,
            student: None,
        }
    }

    #[test]
    fn test_overdue_follows_clock_only() {
        let tx = borrowed(at(16, 9));
        assert!(!tx.is_overdue(at(16, 9)));
        assert!(tx.is_overdue(at(16, 10)));
        assert_eq!(tx.derived_status(at(10, 0)), DerivedStatus::Borrowed);
        assert_eq!(tx.derived_status(at(20, 0)), DerivedStatus::Overdue);
    }

    #[test]
    fn test_returned_is_never_overdue() {
        let mut tx = borrowed(at(2, 9));
        TransactionPatch::returned(at(20, 0)).apply(&mut tx);
        assert!(!tx.is_overdue(at(25, 0)));
        assert_eq!(tx.derived_status(at(25, 0)), DerivedStatus::Returned);
        assert_eq!(tx.due_date, at(2, 9));
        assert_eq!(tx.borrowed_date, at(1, 9));
    }

    #[test]
    fn test_days_overdue_rounds_up() {
        let tx = borrowed(at(10, 9));
        assert_eq!(tx.days_overdue(at(10, 10)), 1);
        assert_eq!(tx.days_overdue(at(12, 9)), 2);
        assert_eq!(tx.days_overdue(at(12, 10)), 3);
    }

    #[test]
    fn test_time_until_due() {
        let tx = borrowed(at(12, 9));
        assert_eq!(tx.days_until_due(at(10, 10)), 2);
        assert_eq!(tx.hours_until_due(at(12, 7)), 2);
    }
}
