// src/services/roster.rs

//! Student roster maintenance and CSV import.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::interchange;
use crate::models::{NewStudent, Student, StudentPatch, StudentStatus, Transaction};
use crate::storage::LibraryStorage;

/// Counts reported after a student import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub success: usize,
    pub duplicates: usize,
    pub errors: usize,
}

/// Roster header counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RosterStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub graduated: usize,
}

impl RosterStats {
    pub fn from_students(students: &[Student]) -> Self {
        students.iter().fold(Self::default(), |mut acc, s| {
            acc.total += 1;
            match s.status {
                StudentStatus::Active => acc.active += 1,
                StudentStatus::Inactive => acc.inactive += 1,
                StudentStatus::Graduated => acc.graduated += 1,
            }
            acc
        })
    }
}

/// Service for roster maintenance.
pub struct RosterService {
    storage: Arc<dyn LibraryStorage>,
}

impl RosterService {
    pub fn new(storage: Arc<dyn LibraryStorage>) -> Self {
        Self { storage }
    }

    pub async fn students(&self) -> Result<Vec<Student>> {
        self.storage.list_students().await
    }

    pub async fn add_student(&self, student: NewStudent) -> Result<Student> {
        let student = NewStudent {
            reg_number: student.reg_number.trim().to_string(),
            ..student
        };
        if student.reg_number.is_empty() {
            return Err(AppError::validation("registration number is required"));
        }
        self.ensure_unique_reg(&student.reg_number, None).await?;

        let stored = self.storage.insert_student(&student).await?;
        log::info!("Added student {}", stored.reg_number);
        Ok(stored)
    }

    pub async fn edit_student(&self, id: &str, patch: StudentPatch) -> Result<Student> {
        let patch = StudentPatch {
            reg_number: patch.reg_number.map(|r| r.trim().to_string()),
            ..patch
        };
        if let Some(reg) = &patch.reg_number {
            if reg.is_empty() {
                return Err(AppError::validation("registration number is required"));
            }
            self.ensure_unique_reg(reg, Some(id)).await?;
        }
        self.storage.update_student(id, &patch).await
    }

    /// Import students from CSV text, one insert at a time.
    ///
    /// Registration numbers already on the roster (or repeated in the file)
    /// are skipped as duplicates. Failed inserts are counted and the import
    /// continues.
    pub async fn import_students(&self, text: &str) -> Result<ImportSummary> {
        let existing = self.storage.list_students().await?;
        let mut known: HashSet<String> = existing.into_iter().map(|s| s.reg_number).collect();
        let mut summary = ImportSummary::default();

        for student in interchange::parse_students(text) {
            if !known.insert(student.reg_number.clone()) {
                summary.duplicates += 1;
                continue;
            }
            match self.storage.insert_student(&student).await {
                Ok(_) => summary.success += 1,
                Err(e) => {
                    log::warn!("Failed to import student {}: {e}", student.reg_number);
                    summary.errors += 1;
                }
            }
        }

        log::info!(
            "Student import: {} added, {} duplicates, {} errors",
            summary.success,
            summary.duplicates,
            summary.errors
        );
        Ok(summary)
    }

    /// Every transaction of one student, latest borrow first.
    pub async fn history(&self, student_id: &str) -> Result<Vec<Transaction>> {
        let mut rows: Vec<Transaction> = self
            .storage
            .list_transactions()
            .await?
            .into_iter()
            .filter(|t| t.student_id == student_id)
            .collect();
        rows.sort_by(|a, b| b.borrowed_date.cmp(&a.borrowed_date));
        Ok(rows)
    }

    pub async fn stats(&self) -> Result<RosterStats> {
        Ok(RosterStats::from_students(&self.students().await?))
    }

    async fn ensure_unique_reg(&self, reg: &str, except_id: Option<&str>) -> Result<()> {
        let students = self.storage.list_students().await?;
        if students
            .iter()
            .any(|s| s.reg_number == reg && Some(s.id.as_str()) != except_id)
        {
            return Err(AppError::duplicate("reg_number", reg));
        }
        Ok(())
    }
}
