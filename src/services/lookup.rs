//! City and street resolution for address forms.
//!
//! A form names either an existing row (`pick_*`) or a new value (`add_*`).
//! Picks win over adds; new values are normalized and fetched-or-created.

use crate::{
    error::{AppError, AppResult},
    models::address::{LookupEntry, LookupTable},
    repository::Repository,
};

/// Upper-case the first character and lower-case the rest
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Blank strings count as absent
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupChoice {
    /// Existing row, by exact name
    Pick(String),
    /// Normalized new value
    Add(String),
}

pub fn choose(table: LookupTable, pick: Option<&str>, add: Option<&str>) -> AppResult<LookupChoice> {
    match (present(pick), present(add)) {
        (Some(pick), _) => Ok(LookupChoice::Pick(pick.to_string())),
        (None, Some(add)) => Ok(LookupChoice::Add(capitalize(add))),
        (None, None) => Err(AppError::field(
            table.field(),
            "required",
            format!(
                "Pick an existing {} or add a new one.",
                table.label().to_lowercase()
            ),
        )),
    }
}

/// True when the form touches this lookup at all
pub fn is_requested(pick: Option<&str>, add: Option<&str>) -> bool {
    present(pick).is_some() || present(add).is_some()
}

#[derive(Clone)]
pub struct LookupService {
    repository: Repository,
}

impl LookupService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, table: LookupTable, pick: Option<&str>, add: Option<&str>) -> AppResult<LookupEntry> {
        self.resolve_choice(table, choose(table, pick, add)?).await
    }

    pub async fn resolve_choice(&self, table: LookupTable, choice: LookupChoice) -> AppResult<LookupEntry> {
        match choice {
            LookupChoice::Pick(name) => self
                .repository
                .lookups
                .find(table, &name)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("{} \"{}\" not found", table.label(), name))),
            LookupChoice::Add(name) => {
                let entry = self.repository.lookups.find_or_create(table, &name).await?;
                tracing::debug!("{} resolved to id={}", table.label(), entry.id);
                Ok(entry)
            }
        }
    }

    pub async fn list(&self, table: LookupTable) -> AppResult<Vec<LookupEntry>> {
        self.repository.lookups.list(table).await
    }
}
