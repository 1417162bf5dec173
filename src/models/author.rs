//! Author model and author list parsing

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

const NAME_MAX_LEN: usize = 100;

/// Full author model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i32,
    pub name: String,
    pub surname: String,
}

/// Name/surname pair, used when creating or renaming authors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthorName {
    pub name: String,
    pub surname: String,
}

impl AuthorName {
    pub fn new(name: impl Into<String>, surname: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            surname: surname.into(),
        }
    }

    /// Trim both parts and check they are non-empty and within column limits.
    pub fn normalized(&self, position: usize) -> AppResult<AuthorName> {
        let name = self.name.trim();
        let surname = self.surname.trim();
        if name.is_empty() || surname.is_empty() {
            return Err(AppError::field(
                "authors",
                "blank_author",
                format!("Author #{} needs both a name and a surname", position + 1),
            ));
        }
        if name.chars().count() > NAME_MAX_LEN || surname.chars().count() > NAME_MAX_LEN {
            return Err(AppError::field(
                "authors",
                "author_too_long",
                format!(
                    "Author #{}: name and surname are limited to {} characters",
                    position + 1,
                    NAME_MAX_LEN
                ),
            ));
        }
        Ok(AuthorName::new(name, surname))
    }
}

impl Author {
    pub fn has_name(&self, other: &AuthorName) -> bool {
        self.name == other.name && self.surname == other.surname
    }
}

/// Upper bound on the authors of one work
pub const MAX_AUTHORS: usize = 100;

/// Split the comma-delimited name and surname fields of an add form into
/// pairs: `names[i]` goes with `surnames[i]`.
pub fn parse_author_lists(names: &str, surnames: &str) -> AppResult<Vec<AuthorName>> {
    let names: Vec<&str> = names.split(',').map(str::trim).collect();
    let surnames: Vec<&str> = surnames.split(',').map(str::trim).collect();

    if names.iter().any(|n| n.is_empty()) {
        return Err(AppError::field(
            "author_name",
            "blank_entry",
            "Author names must be a comma-separated list without empty entries",
        ));
    }
    if surnames.iter().any(|s| s.is_empty()) {
        return Err(AppError::field(
            "author_surname",
            "blank_entry",
            "Author surnames must be a comma-separated list without empty entries",
        ));
    }
    if names.len() != surnames.len() {
        return Err(AppError::field(
            "author_surname",
            "count_mismatch",
            format!(
                "Got {} author names but {} surnames",
                names.len(),
                surnames.len()
            ),
        ));
    }

    if names.len() > MAX_AUTHORS {
        return Err(AppError::field(
            "author_name",
            "too_many",
            format!("A work can have at most {} authors", MAX_AUTHORS),
        ));
    }

    names
        .into_iter()
        .zip(surnames)
        .enumerate()
        .map(|(i, (name, surname))| AuthorName::new(name, surname).normalized(i))
        .collect()
}
