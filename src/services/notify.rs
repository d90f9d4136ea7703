// src/services/notify.rs

//! Reminder messages and `wa.me` deep links.
//!
//! Links are only built here; nothing is sent and delivery is never confirmed.

use chrono::{DateTime, Duration, Utc};
use url::form_urlencoded;

use crate::models::{LibraryConfig, Transaction};

const WHATSAPP_BASE: &str = "https://wa.me/";

/// Which reminder to prepare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum ReminderKind {
    /// Due within the upcoming window
    Upcoming,
    Overdue,
}

/// A prepared reminder for one open borrow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub transaction_id: String,
    pub student_id: String,
    pub student_name: String,
    pub book_name: String,
    /// Days until due for upcoming reminders, days overdue otherwise
    pub days: i64,
    pub message: String,
    pub link: String,
}

/// Open borrows due after `now` and within `window_days`, soonest first.
pub fn upcoming_due<'a>(
    transactions: &'a [Transaction],
    now: DateTime<Utc>,
    window_days: i64,
) -> Vec<&'a Transaction> {
    let until = now + Duration::days(window_days);
    let mut rows: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| t.is_open() && t.due_date > now && t.due_date <= until)
        .collect();
    rows.sort_by_key(|t| t.days_until_due(now));
    rows
}

/// Overdue borrows, most overdue first.
pub fn overdue<'a>(transactions: &'a [Transaction], now: DateTime<Utc>) -> Vec<&'a Transaction> {
    let mut rows: Vec<&Transaction> = transactions.iter().filter(|t| t.is_overdue(now)).collect();
    rows.sort_by_key(|t| std::cmp::Reverse(t.days_overdue(now)));
    rows
}

/// Open borrows due within the next `hours`, earliest due date first.
pub fn upcoming_returns<'a>(
    transactions: &'a [Transaction],
    now: DateTime<Utc>,
    hours: i64,
) -> Vec<&'a Transaction> {
    let until = now + Duration::hours(hours);
    let mut rows: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| t.is_open() && t.due_date > now && t.due_date <= until)
        .collect();
    rows.sort_by_key(|t| t.due_date);
    rows
}

/// Reminder text for one borrower.
pub fn reminder_message(
    kind: ReminderKind,
    student_name: &str,
    book_name: &str,
    days: i64,
    due_date: DateTime<Utc>,
) -> String {
    let due = due_date.format("%d/%m/%Y");
    match kind {
        ReminderKind::Upcoming => format!(
            "Dear {student_name},\n\n\
             This is a reminder that \"{book_name}\" is due in {days} days ({due}).\n\n\
             Please ensure to return it on time to avoid any late fees.\n\n\
             Thank you,\nLibrary Management"
        ),
        ReminderKind::Overdue => format!(
            "Dear {student_name},\n\n\
             This is an urgent reminder that \"{book_name}\" is OVERDUE by {days} days. \
             The book was due on {due}.\n\n\
             Please return the book immediately to avoid additional late fees.\n\n\
             Thank you,\nLibrary Management"
        ),
    }
}

/// `wa.me` link for a phone number. Non-digits are dropped; `None` when no digits remain.
pub fn whatsapp_link(country_code: &str, phone: &str, message: &str) -> Option<String> {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    Some(format!(
        "{WHATSAPP_BASE}{country_code}{digits}?text={}",
        encode_component(message)
    ))
}

/// Percent-encode a query value with `%20` for spaces.
fn encode_component(text: &str) -> String {
    // byte_serialize emits '+' for spaces and %2B for literal pluses
    form_urlencoded::byte_serialize(text.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Build reminders of `kind` for every eligible open borrow.
///
/// Rows without a joined book or a student contact number are skipped.
pub fn build_reminders(
    transactions: &[Transaction],
    kind: ReminderKind,
    now: DateTime<Utc>,
    config: &LibraryConfig,
) -> Vec<Reminder> {
    let rows = match kind {
        ReminderKind::Upcoming => upcoming_due(transactions, now, config.upcoming_window_days),
        ReminderKind::Overdue => overdue(transactions, now),
    };

    rows.into_iter()
        .filter_map(|tx| {
            let book = tx.book.as_ref()?;
            let student = tx.student.as_ref()?;
            let phone = student.contact_number.as_deref()?;

            let days = match kind {
                ReminderKind::Upcoming => tx.days_until_due(now),
                ReminderKind::Overdue => tx.days_overdue(now),
            };
            let message =
                reminder_message(kind, student.display_name(), &book.name, days, tx.due_date);
            let link = whatsapp_link(&config.country_code, phone, &message)?;

            Some(Reminder {
                transaction_id: tx.id.clone(),
                student_id: tx.student_id.clone(),
                student_name: student.display_name().to_string(),
                book_name: book.name.clone(),
                days,
                message,
                link,
            })
        })
        .collect()
}
