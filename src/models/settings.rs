// src/models/settings.rs

//! The single-row library settings record.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Return period used when no settings row exists.
pub const DEFAULT_RETURN_DAYS: u32 = 15;

/// Bounds accepted for the return period.
pub const RETURN_DAYS_RANGE: std::ops::RangeInclusive<u32> = 1..=365;

/// Staff-editable library settings. There is only ever row `id = 1`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LibrarySettings {
    #[serde(default = "default_id")]
    pub id: i64,

    #[serde(default = "default_return_days")]
    pub default_return_days: u32,
}

fn default_id() -> i64 {
    1
}

fn default_return_days() -> u32 {
    DEFAULT_RETURN_DAYS
}

impl LibrarySettings {
    /// Build a settings row, rejecting out-of-range return periods.
    pub fn with_return_days(days: u32) -> Result<Self> {
        let settings = Self {
            id: default_id(),
            default_return_days: days,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !RETURN_DAYS_RANGE.contains(&self.default_return_days) {
            return Err(AppError::validation(format!(
                "default_return_days must be between {} and {}, got {}",
                RETURN_DAYS_RANGE.start(),
                RETURN_DAYS_RANGE.end(),
                self.default_return_days
            )));
        }
        Ok(())
    }
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            id: default_id(),
            default_return_days: DEFAULT_RETURN_DAYS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        assert!(LibrarySettings::with_return_days(1).is_ok());
        assert!(LibrarySettings::with_return_days(365).is_ok());
        assert!(LibrarySettings::with_return_days(0).is_err());
        assert!(LibrarySettings::with_return_days(366).is_err());
    }

    #[test]
    fn test_default_period() {
        assert_eq!(LibrarySettings::default().default_return_days, 15);
    }
}
