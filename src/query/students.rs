//! Roster listing.

use crate::models::{Student, StudentStatus};
use crate::query::SortOrder;
use crate::utils::{compare_text, contains_ci};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum StudentSearchField {
    RegNumber,
    #[default]
    Name,
    Department,
    Section,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum StudentSortField {
    #[default]
    Name,
    RegNumber,
    Department,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum StudentStatusFilter {
    #[default]
    All,
    Active,
    Inactive,
    Graduated,
}

impl StudentStatusFilter {
    fn accepts(self, status: StudentStatus) -> bool {
        match self {
            StudentStatusFilter::All => true,
            StudentStatusFilter::Active => status == StudentStatus::Active,
            StudentStatusFilter::Inactive => status == StudentStatus::Inactive,
            StudentStatusFilter::Graduated => status == StudentStatus::Graduated,
        }
    }
}

/// Search, filter and sort settings for the roster table.
#[derive(Debug, Clone, Default)]
pub struct StudentQuery {
    pub search: String,
    pub search_field: StudentSearchField,
    /// Only students in this year, when set
    pub year: Option<u32>,
    pub status: StudentStatusFilter,
    pub sort_by: StudentSortField,
    pub order: SortOrder,
}

impl StudentQuery {
    pub fn matches(&self, student: &Student) -> bool {
        let field = match self.search_field {
            StudentSearchField::RegNumber => student.reg_number.as_str(),
            StudentSearchField::Name => student.display_name(),
            StudentSearchField::Department => student.department.as_deref().unwrap_or(""),
            StudentSearchField::Section => student.section.as_deref().unwrap_or(""),
        };
        let year = self.year.is_none_or(|y| student.year == Some(y));
        year && self.status.accepts(student.status) && contains_ci(field, &self.search)
    }

    /// Filtered and sorted view of `students`.
    pub fn apply<'a>(&self, students: &'a [Student]) -> Vec<&'a Student> {
        let mut view: Vec<&Student> = students.iter().filter(|s| self.matches(s)).collect();
        view.sort_by(|a, b| {
            let key = |s: &'a Student| match self.sort_by {
                StudentSortField::Name => s.display_name(),
                StudentSortField::RegNumber => s.reg_number.as_str(),
                StudentSortField::Department => s.department.as_deref().unwrap_or(""),
            };
            self.order.apply(compare_text(key(*a), key(*b)))
        });
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(reg: &str, name: Option<&str>, year: u32, status: &str) -> Student {
        serde_json::from_value(serde_json::json!({
            "id": reg, "reg_number": reg, "name": name, "department": "CSE",
            "year": year, "status": status
        }))
        .unwrap()
    }

    fn roster() -> Vec<Student> {
        vec![
            student("R3", Some("Meera"), 2, "active"),
            student("R1", None, 1, "graduated"),
            student("R2", Some("asha"), 2, "active"),
        ]
    }

    #[test]
    fn test_missing_name_sorts_first() {
        let students = roster();
        let regs: Vec<&str> = StudentQuery::default()
            .apply(&students)
            .iter()
            .map(|s| s.reg_number.as_str())
            .collect();
        assert_eq!(regs, vec!["R1", "R2", "R3"]);
    }

    #[test]
    fn test_year_and_status_filters() {
        let students = roster();
        let query = StudentQuery {
            year: Some(2),
            status: StudentStatusFilter::Active,
            order: SortOrder::Desc,
            ..StudentQuery::default()
        };
        let regs: Vec<&str> = query.apply(&students).iter().map(|s| s.reg_number.as_str()).collect();
        assert_eq!(regs, vec!["R3", "R2"]);
    }

    #[test]
    fn test_search_by_reg_number() {
        let students = roster();
        let query = StudentQuery {
            search: "r1".into(),
            search_field: StudentSearchField::RegNumber,
            ..StudentQuery::default()
        };
        assert_eq!(query.apply(&students).len(), 1);
    }
}
