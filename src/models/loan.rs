//! Loanable units and their issue/return records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::work::WorkKind;
use crate::error::{AppError, AppResult};

/// Reference to exactly one catalog work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct WorkRef {
    pub kind: WorkKind,
    pub id: i32,
}

impl WorkRef {
    pub fn new(kind: WorkKind, id: i32) -> Self {
        Self { kind, id }
    }

    /// Build from the three nullable FK columns. Exactly one must be set.
    pub fn from_columns(
        article_id: Option<i32>,
        science_book_id: Option<i32>,
        fiction_book_id: Option<i32>,
    ) -> Option<Self> {
        match (article_id, science_book_id, fiction_book_id) {
            (Some(id), None, None) => Some(WorkRef::new(WorkKind::Article, id)),
            (None, Some(id), None) => Some(WorkRef::new(WorkKind::ScienceBook, id)),
            (None, None, Some(id)) => Some(WorkRef::new(WorkKind::FictionBook, id)),
            _ => None,
        }
    }

    /// Inverse of [`WorkRef::from_columns`]
    pub fn columns(&self) -> (Option<i32>, Option<i32>, Option<i32>) {
        match self.kind {
            WorkKind::Article => (Some(self.id), None, None),
            WorkKind::ScienceBook => (None, Some(self.id), None),
            WorkKind::FictionBook => (None, None, Some(self.id)),
        }
    }
}

/// A loanable copy of one work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LibraryUnit {
    pub id: i32,
    pub work: WorkRef,
    pub available: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct LibraryUnitRow {
    pub id: i32,
    pub article_id: Option<i32>,
    pub science_book_id: Option<i32>,
    pub fiction_book_id: Option<i32>,
    pub available: bool,
}

impl TryFrom<LibraryUnitRow> for LibraryUnit {
    type Error = AppError;

    fn try_from(row: LibraryUnitRow) -> AppResult<Self> {
        let work = WorkRef::from_columns(row.article_id, row.science_book_id, row.fiction_book_id)
            .ok_or_else(|| {
                AppError::Internal(format!("Library unit {} does not reference exactly one work", row.id))
            })?;
        Ok(LibraryUnit {
            id: row.id,
            work,
            available: row.available,
        })
    }
}

/// Issue/return record of a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UnitStatus {
    pub id: i32,
    pub account_id: i32,
    pub unit_id: i32,
    pub issued_at: DateTime<Utc>,
    /// Nominal return deadline
    pub return_due: DateTime<Utc>,
    /// Actual return time, `None` while the unit is out
    pub returned_at: Option<DateTime<Utc>>,
}

impl UnitStatus {
    pub fn is_open(&self) -> bool {
        self.returned_at.is_none()
    }

    /// A returned unit is late if it came back after the deadline; one still
    /// out is late once `now` passes the deadline.
    pub fn is_late(&self, now: DateTime<Utc>) -> bool {
        match self.returned_at {
            Some(returned) => returned > self.return_due,
            None => now > self.return_due,
        }
    }
}

/// Loan record as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub account_id: i32,
    pub unit_id: i32,
    pub issued_at: DateTime<Utc>,
    pub return_due: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub is_late: bool,
}

impl LoanDetails {
    pub fn from_status(status: UnitStatus, now: DateTime<Utc>) -> Self {
        let is_late = status.is_late(now);
        Self {
            id: status.id,
            account_id: status.account_id,
            unit_id: status.unit_id,
            issued_at: status.issued_at,
            return_due: status.return_due,
            returned_at: status.returned_at,
            is_late,
        }
    }
}

/// Create unit request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUnit {
    pub work: WorkRef,
    pub available: Option<bool>,
}

/// Issue unit request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct IssueUnit {
    pub account_id: i32,
    /// Loan length; the configured default applies when absent
    #[validate(range(min = 1, max = 365))]
    pub loan_days: Option<i64>,
}
