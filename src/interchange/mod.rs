//! CSV interchange: import parsing and export rendering.
//!
//! Reading accepts plain comma-separated rows as well as RFC 4180 quoting
//! (`"a, b"`, `""` for a literal quote, quoted line breaks). Writing quotes
//! any field that would otherwise not survive a re-read.

mod books;
mod reports;
mod students;

use std::borrow::Cow;

use chrono::{DateTime, Utc};

pub use books::{
    BOOK_HEADERS, ImportCounts, ImportPreview, ImportRecord, ImportStatus, export_books,
    parse_available, preview_books,
};
pub use reports::{OVERDUE_HEADERS, TRANSACTION_HEADERS, export_overdue, export_transactions};
pub use students::{STUDENT_HEADERS, export_students, extract_email, parse_students};

/// Split CSV text into rows of trimmed fields, header included.
///
/// Both `\n` and `\r\n` end a row. Blank rows are skipped.
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            // Only an opening quote at the start of a field starts quoting
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            ',' => row.push(finish_field(&mut field)),
            '\n' => {
                row.push(finish_field(&mut field));
                push_row(&mut rows, std::mem::take(&mut row));
            }
            '\r' => {}
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(finish_field(&mut field));
        push_row(&mut rows, row);
    }
    rows
}

/// Data rows of a CSV file: everything after the header line.
pub fn data_rows(text: &str) -> Vec<Vec<String>> {
    parse_rows(text).into_iter().skip(1).collect()
}

fn finish_field(field: &mut String) -> String {
    let value = field.trim().to_string();
    field.clear();
    value
}

fn push_row(rows: &mut Vec<Vec<String>>, row: Vec<String>) {
    let blank = row.iter().all(|f| f.is_empty());
    if !blank {
        rows.push(row);
    }
}

/// Quote a field when it contains a delimiter, a quote or a line break.
pub fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Append one CSV row terminated by `\n`.
pub fn write_row<S: AsRef<str>>(out: &mut String, fields: &[S]) {
    let line: Vec<Cow<'_, str>> = fields.iter().map(|f| escape_field(f.as_ref())).collect();
    out.push_str(&line.join(","));
    out.push('\n');
}

/// Calendar date used in every export.
pub fn format_date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}
