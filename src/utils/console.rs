// src/utils/console.rs

//! Console presentation helpers for the command line front end.
//!
//! Diagnostics go through the `log` facade; this module only renders
//! user-facing tables, summaries and progress lines.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

static QUIET: AtomicBool = AtomicBool::new(false);

/// Suppress all console output (used by `--quiet`).
pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

fn enabled() -> bool {
    !QUIET.load(Ordering::Relaxed)
}

/// Print a header
pub fn header(title: &str) {
    if enabled() {
        let border = "═".repeat(60);
        println!("{border}");
        println!("  {title}");
        println!("{border}");
    }
}

/// Print a separator line
pub fn separator() {
    if enabled() {
        println!("{}", "─".repeat(60));
    }
}

/// Print a plain line
pub fn line(message: &str) {
    if enabled() {
        println!("{message}");
    }
}

/// Print a sub-item (indented)
pub fn sub_item(message: &str) {
    if enabled() {
        println!("    {message}");
    }
}

/// Print a success line
pub fn success(message: &str) {
    if enabled() {
        println!("✓ {message}");
    }
}

/// Print an in-place progress percentage
pub fn progress(label: &str, percent: f64) {
    if enabled() {
        print!("\r{label}: {percent:>5.1}%");
        let _ = std::io::stdout().flush();
        if percent >= 100.0 {
            println!();
        }
    }
}

/// Print a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    if enabled() {
        println!();
        println!("[SUMMARY] {title}");
        for (key, value) in items {
            println!("    {key}: {value}");
        }
    }
}

/// Render rows as a left-aligned text table.
pub fn table(headers: &[&str], rows: &[Vec<String>]) {
    if enabled() {
        print!("{}", render_table(headers, rows));
    }
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let format_row = |cells: Vec<&str>| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect();
        format!("{}\n", padded.join("  ").trim_end())
    };

    let mut out = format_row(headers.to_vec());
    let dashes: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&format_row(dashes.iter().map(String::as_str).collect()));
    for row in rows {
        out.push_str(&format_row(row.iter().map(String::as_str).collect()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_table_pads_columns() {
        let rendered = render_table(
            &["ISBN", "Name"],
            &[vec!["A1".into(), "Rust".into()], vec!["B22222".into(), "Go".into()]],
        );
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "ISBN    Name");
        assert_eq!(lines[1], "------  ----");
        assert_eq!(lines[2], "A1      Rust");
        assert_eq!(lines[3], "B22222  Go");
    }
}
