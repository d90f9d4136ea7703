//! Transaction history and overdue listings.

use chrono::{DateTime, Days, Duration, Months, NaiveDate, Utc};

use crate::models::{DerivedStatus, Transaction};
use crate::query::SortOrder;
use crate::utils::{compare_text, contains_ci};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum TransactionStatusFilter {
    #[default]
    All,
    /// Open and not yet past due
    Borrowed,
    Returned,
    Overdue,
}

/// Window over `borrowed_date`, ending now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateFilter {
    #[default]
    All,
    /// Since midnight
    Today,
    /// The last seven days
    Week,
    /// The last calendar month
    Month,
    /// Inclusive calendar-day range; open ends are unbounded
    Custom {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
}

impl DateFilter {
    /// `[start, end]` bounds of the window.
    pub fn bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = match self {
            DateFilter::All => DateTime::<Utc>::MIN_UTC,
            DateFilter::Today => now
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .map_or(now, |midnight| midnight.and_utc()),
            DateFilter::Week => now - Duration::days(7),
            DateFilter::Month => now.checked_sub_months(Months::new(1)).unwrap_or(now),
            DateFilter::Custom { from, .. } => from
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map_or(DateTime::<Utc>::MIN_UTC, |d| d.and_utc()),
        };
        let end = match self {
            DateFilter::Custom { to: Some(to), .. } => to
                .checked_add_days(Days::new(1))
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map_or(DateTime::<Utc>::MAX_UTC, |d| d.and_utc() - Duration::milliseconds(1)),
            DateFilter::Custom { to: None, .. } => DateTime::<Utc>::MAX_UTC,
            _ => now,
        };
        (start, end)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum TransactionSortField {
    /// Borrowed date
    #[default]
    Date,
    Student,
    Book,
    Status,
}

/// Search, filter and sort settings for the transaction history.
#[derive(Debug, Clone)]
pub struct TransactionQuery {
    /// Matched against book name, access number, student name and registration number
    pub search: String,
    pub status: TransactionStatusFilter,
    pub dates: DateFilter,
    pub sort_by: TransactionSortField,
    pub order: SortOrder,
}

impl Default for TransactionQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            status: TransactionStatusFilter::All,
            dates: DateFilter::All,
            sort_by: TransactionSortField::Date,
            order: SortOrder::Desc,
        }
    }
}

impl TransactionQuery {
    pub fn matches(&self, tx: &Transaction, now: DateTime<Utc>) -> bool {
        let (start, end) = self.dates.bounds(now);
        let in_range = tx.borrowed_date >= start && tx.borrowed_date <= end;

        let status = match self.status {
            TransactionStatusFilter::All => true,
            TransactionStatusFilter::Borrowed => tx.derived_status(now) == DerivedStatus::Borrowed,
            TransactionStatusFilter::Returned => tx.derived_status(now) == DerivedStatus::Returned,
            TransactionStatusFilter::Overdue => tx.derived_status(now) == DerivedStatus::Overdue,
        };

        in_range && status && matches_parties(tx, &self.search, true)
    }

    /// Filtered and sorted view of `transactions` as of `now`.
    pub fn apply<'a>(&self, transactions: &'a [Transaction], now: DateTime<Utc>) -> Vec<&'a Transaction> {
        let mut view: Vec<&Transaction> = transactions
            .iter()
            .filter(|t| self.matches(t, now))
            .collect();
        view.sort_by(|a, b| {
            let ordering = match self.sort_by {
                TransactionSortField::Date => a.borrowed_date.cmp(&b.borrowed_date),
                TransactionSortField::Student => compare_text(a.student_name(), b.student_name()),
                TransactionSortField::Book => compare_text(a.book_name(), b.book_name()),
                TransactionSortField::Status => a.status.as_str().cmp(b.status.as_str()),
            };
            self.order.apply(ordering)
        });
        view
    }
}

fn matches_parties(tx: &Transaction, search: &str, include_isbn: bool) -> bool {
    contains_ci(tx.book_name(), search)
        || (include_isbn && contains_ci(tx.book_isbn(), search))
        || contains_ci(tx.student_name(), search)
        || contains_ci(tx.student_reg_number(), search)
}

/// Header counts of the transaction history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionTotals {
    pub total: usize,
    /// Open and not past due
    pub borrowed: usize,
    pub overdue: usize,
    pub returned: usize,
}

pub fn totals(transactions: &[Transaction], now: DateTime<Utc>) -> TransactionTotals {
    transactions
        .iter()
        .fold(TransactionTotals::default(), |mut acc, tx| {
            acc.total += 1;
            match tx.derived_status(now) {
                DerivedStatus::Borrowed => acc.borrowed += 1,
                DerivedStatus::Overdue => acc.overdue += 1,
                DerivedStatus::Returned => acc.returned += 1,
            }
            acc
        })
}

/// Overdue rows whose book name, student name or registration number
/// contains `search`, most overdue first.
pub fn overdue_matching<'a>(
    transactions: &'a [Transaction],
    search: &str,
    now: DateTime<Utc>,
) -> Vec<&'a Transaction> {
    let mut view: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| t.is_overdue(now) && matches_parties(t, search, false))
        .collect();
    view.sort_by_key(|t| t.due_date);
    view
}
