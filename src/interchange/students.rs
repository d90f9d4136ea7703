//! Student CSV import and export.

use std::sync::LazyLock;

use regex::Regex;

use crate::interchange::{data_rows, write_row};
use crate::models::{NewStudent, Student, StudentStatus};

/// Columns of the student export.
pub const STUDENT_HEADERS: [&str; 10] = [
    "Registration Number",
    "Name",
    "Department",
    "Section",
    "Year",
    "Semester",
    "Contact Number",
    "Contact Info",
    "Email",
    "Status",
];

const DEFAULT_SECTION: &str = "A";

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._-]+@[a-zA-Z0-9._-]+\.[a-zA-Z0-9._-]+")
        .expect("email pattern is valid")
});

/// Pull the first email address out of free text.
///
/// Returns the address and the remaining text with the address removed.
pub fn extract_email(text: &str) -> (Option<String>, String) {
    match EMAIL.find(text) {
        Some(m) => {
            let rest = format!("{}{}", &text[..m.start()], &text[m.end()..]);
            (Some(m.as_str().to_string()), rest.trim().to_string())
        }
        None => (None, text.trim().to_string()),
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Read the leading whole number of a cell, so `2nd` reads as 2. Cells with
/// no leading digits, zero, or a sign fall back to 1.
fn leading_number(value: &str) -> u32 {
    let value = value.trim_start();
    let end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    match value[..end].parse() {
        Ok(0) | Err(_) => 1,
        Ok(n) => n,
    }
}

/// Parse a student import file into new records.
///
/// Columns are positional: registration number, name, department, section,
/// year, semester, contact number, contact info. Rows without a
/// registration number, name or department are skipped. Section defaults
/// to `A`, year and semester to 1.
pub fn parse_students(text: &str) -> Vec<NewStudent> {
    data_rows(text)
        .into_iter()
        .enumerate()
        .filter_map(|(index, fields)| {
            let field = |i: usize| fields.get(i).map(String::as_str).unwrap_or("");

            let (reg_number, name, department) = (field(0), field(1), field(2));
            if reg_number.is_empty() || name.is_empty() || department.is_empty() {
                log::debug!("Skipping incomplete student row {}", index + 2);
                return None;
            }

            let (email, contact_info) = extract_email(field(7));
            Some(NewStudent {
                reg_number: reg_number.to_string(),
                name: Some(name.to_string()),
                department: Some(department.to_string()),
                section: Some(non_empty(field(3)).unwrap_or_else(|| DEFAULT_SECTION.to_string())),
                year: Some(leading_number(field(4))),
                semester: Some(leading_number(field(5))),
                contact_number: non_empty(field(6)),
                contact_info: non_empty(&contact_info),
                email,
                status: StudentStatus::Active,
            })
        })
        .collect()
}

/// Render the whole roster as CSV.
pub fn export_students(students: &[Student]) -> String {
    let mut out = String::new();
    write_row(&mut out, &STUDENT_HEADERS);
    for s in students {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        let number = |v: Option<u32>| v.map(|n| n.to_string()).unwrap_or_default();
        write_row(
            &mut out,
            &[
                s.reg_number.clone(),
                text(&s.name),
                text(&s.department),
                text(&s.section),
                number(s.year),
                number(s.semester),
                text(&s.contact_number),
                text(&s.contact_info),
                text(&s.email),
                s.status.to_string(),
            ],
        );
    }
    out
}
