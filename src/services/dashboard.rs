// src/services/dashboard.rs

//! Dashboard statistics computed from a collection snapshot.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Months, Utc};

use crate::models::TransactionStatus;
use crate::services::{RosterStats, Snapshot};

/// Months covered by the activity chart.
pub const ACTIVITY_MONTHS: u32 = 6;

/// Borrow activity of one calendar month, by borrowed date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyActivity {
    /// e.g. `Mar 2025`
    pub label: String,
    pub year: i32,
    pub month: u32,
    /// Rows from this month still open
    pub borrowed: usize,
    /// Rows from this month since returned
    pub returned: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_books: usize,
    pub available_books: usize,
    pub borrowed_books: usize,
    pub overdue_books: usize,
    /// Oldest month first
    pub monthly: Vec<MonthlyActivity>,
    /// Students per department, largest first
    pub departments: Vec<(String, usize)>,
    pub students: RosterStats,
}

/// Compute dashboard figures as of `now`.
pub fn dashboard_stats(snapshot: &Snapshot, now: DateTime<Utc>) -> DashboardStats {
    let books = &snapshot.books;
    let open: Vec<_> = snapshot.transactions.iter().filter(|t| t.is_open()).collect();

    DashboardStats {
        total_books: books.len(),
        available_books: books.iter().filter(|b| b.is_available).count(),
        borrowed_books: open.len(),
        overdue_books: open.iter().filter(|t| t.is_overdue(now)).count(),
        monthly: monthly_activity(snapshot, now),
        departments: department_counts(snapshot),
        students: RosterStats::from_students(&snapshot.students),
    }
}

fn monthly_activity(snapshot: &Snapshot, now: DateTime<Utc>) -> Vec<MonthlyActivity> {
    (0..ACTIVITY_MONTHS)
        .rev()
        .filter_map(|back| now.checked_sub_months(Months::new(back)))
        .map(|at| {
            let (year, month) = (at.year(), at.month());
            let in_month = snapshot
                .transactions
                .iter()
                .filter(|t| t.borrowed_date.year() == year && t.borrowed_date.month() == month);

            let (mut borrowed, mut returned) = (0, 0);
            for tx in in_month {
                match tx.status {
                    TransactionStatus::Borrowed => borrowed += 1,
                    TransactionStatus::Returned => returned += 1,
                }
            }

            MonthlyActivity {
                label: at.format("%b %Y").to_string(),
                year,
                month,
                borrowed,
                returned,
            }
        })
        .collect()
}

fn department_counts(snapshot: &Snapshot) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for student in &snapshot.students {
        *counts.entry(student.department_or_unknown()).or_default() += 1;
    }

    let mut departments: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect();
    departments.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    departments
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn snapshot() -> Snapshot {
        let day = |m: u32, d: u32| Utc.with_ymd_and_hms(2025, m, d, 9, 0, 0).unwrap();
        Snapshot {
            books: serde_json::from_value(json!([
                {"id": "b1", "isbn": "A1", "name": "X", "author": "Y", "is_available": false},
                {"id": "b2", "isbn": "A2", "name": "X", "author": "Y", "is_available": false},
                {"id": "b3", "isbn": "A3", "name": "Z", "author": "Y", "is_available": true}
            ]))
            .unwrap(),
            students: serde_json::from_value(json!([
                {"id": "s1", "reg_number": "R1", "department": "CSE"},
                {"id": "s2", "reg_number": "R2", "department": "CSE", "status": "graduated"},
                {"id": "s3", "reg_number": "R3"}
            ]))
            .unwrap(),
            transactions: serde_json::from_value(json!([
                {"id": "t1", "book_id": "b1", "student_id": "s1", "status": "Borrowed",
                 "borrowed_date": day(3, 1), "due_date": day(3, 16)},
                {"id": "t2", "book_id": "b2", "student_id": "s1", "status": "Borrowed",
                 "borrowed_date": day(3, 20), "due_date": day(4, 4)},
                {"id": "t3", "book_id": "b3", "student_id": "s2", "status": "Returned",
                 "borrowed_date": day(1, 5), "due_date": day(1, 20), "return_date": day(1, 10)}
            ]))
            .unwrap(),
        }
    }

    #[test]
    fn test_totals() {
        let now = Utc.with_ymd_and_hms(2025, 3, 25, 9, 0, 0).unwrap();
        let stats = dashboard_stats(&snapshot(), now);
        assert_eq!(stats.total_books, 3);
        assert_eq!(stats.available_books, 1);
        assert_eq!(stats.borrowed_books, 2);
        assert_eq!(stats.overdue_books, 1);
        assert_eq!(stats.students.graduated, 1);
        assert_eq!(
            stats.departments,
            vec![("CSE".to_string(), 2), ("Unknown".to_string(), 1)]
        );
    }

    #[test]
    fn test_monthly_activity_window() {
        let now = Utc.with_ymd_and_hms(2025, 3, 25, 9, 0, 0).unwrap();
        let monthly = dashboard_stats(&snapshot(), now).monthly;
        assert_eq!(monthly.len(), 6);
        assert_eq!(monthly[0].label, "Oct 2024");
        assert_eq!(monthly[5].label, "Mar 2025");
        assert_eq!(monthly[5].borrowed, 2);
        assert_eq!(monthly[3].label, "Jan 2025");
        assert_eq!(monthly[3].returned, 1);
    }
}
