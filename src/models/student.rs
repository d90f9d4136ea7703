// src/models/student.rs

//! Student roster records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Department assigned to synthesized staff borrowers.
pub const STAFF_DEPARTMENT: &str = "Staff";

/// Enrollment status. Transitions are free-form.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    #[default]
    Active,
    Inactive,
    Graduated,
}

impl StudentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentStatus::Active => "active",
            StudentStatus::Inactive => "inactive",
            StudentStatus::Graduated => "graduated",
        }
    }
}

impl fmt::Display for StudentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(StudentStatus::Active),
            "inactive" => Ok(StudentStatus::Inactive),
            "graduated" => Ok(StudentStatus::Graduated),
            other => Err(AppError::validation(format!(
                "unknown student status '{other}'"
            ))),
        }
    }
}

/// A borrower. Everything except `reg_number` and `status` may be absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Student {
    pub id: String,

    /// Registration number, unique across students
    pub reg_number: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub department: Option<String>,

    #[serde(default)]
    pub section: Option<String>,

    #[serde(default)]
    pub year: Option<u32>,

    #[serde(default)]
    pub semester: Option<u32>,

    #[serde(default)]
    pub contact_number: Option<String>,

    #[serde(default)]
    pub contact_info: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub status: StudentStatus,

    #[serde(default)]
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl Student {
    /// Name for display and search; missing names read as empty.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    /// Department for grouping; missing departments read as `Unknown`.
    pub fn department_or_unknown(&self) -> &str {
        self.department
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or("Unknown")
    }

    pub fn is_staff(&self) -> bool {
        self.department.as_deref() == Some(STAFF_DEPARTMENT)
    }
}

/// Payload for creating a student.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewStudent {
    pub reg_number: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semester: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default)]
    pub status: StudentStatus,
}

impl NewStudent {
    /// The pseudo-student record used when issuing to a staff member.
    pub fn staff(staff_id: impl Into<String>, staff_name: impl Into<String>) -> Self {
        Self {
            reg_number: staff_id.into(),
            name: Some(staff_name.into()),
            department: Some(STAFF_DEPARTMENT.to_string()),
            section: Some(STAFF_DEPARTMENT.to_string()),
            year: Some(1),
            semester: Some(1),
            contact_info: Some("Staff Member".to_string()),
            status: StudentStatus::Active,
            ..Self::default()
        }
    }
}

/// Partial update for a student. Only `Some` fields are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StudentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reg_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semester: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StudentStatus>,
}

impl StudentPatch {
    /// Apply this patch to a student in place.
    pub fn apply(&self, student: &mut Student) {
        if let Some(v) = &self.reg_number {
            student.reg_number = v.clone();
        }
        if let Some(v) = &self.name {
            student.name = Some(v.clone());
        }
        if let Some(v) = &self.department {
            student.department = Some(v.clone());
        }
        if let Some(v) = &self.section {
            student.section = Some(v.clone());
        }
        if let Some(v) = self.year {
            student.year = Some(v);
        }
        if let Some(v) = self.semester {
            student.semester = Some(v);
        }
        if let Some(v) = &self.contact_number {
            student.contact_number = Some(v.clone());
        }
        if let Some(v) = &self.contact_info {
            student.contact_info = Some(v.clone());
        }
        if let Some(v) = &self.email {
            student.email = Some(v.clone());
        }
        if let Some(v) = self.status {
            student.status = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nullable_fields() {
        let json = r#"{"id":"s1","reg_number":"R1","name":null,"status":"graduated"}"#;
        let student: Student = serde_json::from_str(json).unwrap();
        assert_eq!(student.display_name(), "");
        assert_eq!(student.department_or_unknown(), "Unknown");
        assert_eq!(student.status, StudentStatus::Graduated);
    }

    #[test]
    fn test_staff_record() {
        let staff = NewStudent::staff("EMP7", "Ravi");
        assert_eq!(staff.department.as_deref(), Some("Staff"));
        assert_eq!(staff.contact_info.as_deref(), Some("Staff Member"));
        assert_eq!(staff.status, StudentStatus::Active);
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("Active".parse::<StudentStatus>().unwrap(), StudentStatus::Active);
        assert!("expelled".parse::<StudentStatus>().is_err());
    }
}
