//! Overdue and transaction history reports.

use chrono::{DateTime, Utc};

use crate::interchange::{format_date, write_row};
use crate::models::Transaction;
use crate::query;

pub const OVERDUE_HEADERS: [&str; 10] = [
    "Book Name",
    "Access No",
    "Student Name",
    "Registration Number",
    "Borrowed Date",
    "Due Date",
    "Days Overdue",
    "Remarks",
    "Remarks Date",
    "Remarks By",
];

pub const TRANSACTION_HEADERS: [&str; 9] = [
    "Transaction Date",
    "Book Name",
    "Access No",
    "Student Name",
    "Registration Number",
    "Status",
    "Due Date",
    "Return Date",
    "Days Overdue",
];

/// Render the rows overdue as of `now`, earliest due first. Returned and
/// not-yet-due rows are left out.
pub fn export_overdue(transactions: &[Transaction], now: DateTime<Utc>) -> String {
    let mut out = String::new();
    write_row(&mut out, &OVERDUE_HEADERS);
    for tx in query::overdue_matching(transactions, "", now) {
        write_row(
            &mut out,
            &[
                tx.book_name().to_string(),
                tx.book_isbn().to_string(),
                tx.student_name().to_string(),
                tx.student_reg_number().to_string(),
                format_date(tx.borrowed_date),
                format_date(tx.due_date),
                tx.days_overdue(now).to_string(),
                tx.remarks.clone().unwrap_or_default(),
                tx.remarks_date.map(format_date).unwrap_or_default(),
                tx.remarks_by.clone().unwrap_or_default(),
            ],
        );
    }
    out
}

/// Render the transaction history. Missing return dates and rows that are
/// not overdue show `-`.
pub fn export_transactions(transactions: &[Transaction], now: DateTime<Utc>) -> String {
    let mut out = String::new();
    write_row(&mut out, &TRANSACTION_HEADERS);
    for tx in transactions {
        let days_overdue = if tx.is_overdue(now) {
            tx.days_overdue(now).to_string()
        } else {
            "-".to_string()
        };
        write_row(
            &mut out,
            &[
                format_date(tx.borrowed_date),
                tx.book_name().to_string(),
                tx.book_isbn().to_string(),
                tx.student_name().to_string(),
                tx.student_reg_number().to_string(),
                tx.status.to_string(),
                format_date(tx.due_date),
                tx.return_date.map(format_date).unwrap_or_else(|| "-".to_string()),
                days_overdue,
            ],
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Book, Student, TransactionStatus};
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0).unwrap()
    }

    fn tx(due: DateTime<Utc>, status: TransactionStatus) -> Transaction {
        let book: Book = serde_json::from_value(serde_json::json!({
            "id": "b1", "isbn": "A1", "name": "Rust, 2nd ed", "author": "K", "is_available": false
        }))
        .unwrap();
        let student: Student =
            serde_json::from_value(serde_json::json!({"id": "s1", "reg_number": "R1", "name": "Asha"}))
                .unwrap();
        Transaction {
            id: "t1".into(),
            book_id: "b1".into(),
            student_id: "s1".into(),
            borrowed_date: at(1),
            due_date: due,
            return_date: None,
            status,
            remarks: Some("called parent".into()),
            remarks_date: Some(at(18)),
            remarks_by: Some("desk".into()),
            created_at: at(1),
            updated_at: at(1),
            book: Some(book),
            student: Some(student),
        }
    }

    #[test]
    fn test_overdue_report() {
        let csv = export_overdue(&[tx(at(16), TransactionStatus::Borrowed)], at(20));
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(
            row,
            "\"Rust, 2nd ed\",A1,Asha,R1,2025-03-01,2025-03-16,4,called parent,2025-03-18,desk"
        );
    }

    #[test]
    fn test_overdue_report_skips_current_and_returned() {
        let mut returned = tx(at(10), TransactionStatus::Returned);
        returned.id = "returned".into();
        returned.return_date = Some(at(12));
        let mut later = tx(at(18), TransactionStatus::Borrowed);
        later.remarks = Some("later".into());
        let mut earlier = tx(at(14), TransactionStatus::Borrowed);
        earlier.remarks = Some("earlier".into());
        let current = tx(at(25), TransactionStatus::Borrowed);

        let csv = export_overdue(&[returned, later, current, earlier], at(20));
        let rows: Vec<&str> = csv.lines().skip(1).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].contains(",2025-03-14,6,earlier,"));
        assert!(rows[1].contains(",2025-03-18,2,later,"));

        let none = export_overdue(&[tx(at(25), TransactionStatus::Borrowed)], at(20));
        assert_eq!(none.lines().count(), 1);
    }

    #[test]
    fn test_transaction_report_dashes() {
        let csv = export_transactions(&[tx(at(25), TransactionStatus::Borrowed)], at(20));
        let row = csv.lines().nth(1).unwrap();
        assert!(row.ends_with(",Borrowed,2025-03-25,-,-"));

        let csv = export_transactions(&[tx(at(16), TransactionStatus::Borrowed)], at(20));
        assert!(csv.lines().nth(1).unwrap().ends_with(",-,4"));
    }
}
