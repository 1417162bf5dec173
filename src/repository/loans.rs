//! Library units and unit statuses repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Transaction};

use super::LendingRepository;
use crate::{
    error::{AppError, AppResult},
    models::loan::{LibraryUnit, LibraryUnitRow, UnitStatus, WorkRef},
};

const UNIT_COLUMNS: &str = "id, article_id, science_book_id, fiction_book_id, available";
const STATUS_COLUMNS: &str = "id, account_id, unit_id, issued_at, return_due, returned_at";

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn unit_exists(tx: &mut Transaction<'_, Postgres>, id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM library_units WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut **tx)
            .await?;
        Ok(exists)
    }
}

fn unit_not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Library unit with id {} not found", id))
}

#[async_trait]
impl LendingRepository for LoansRepository {
    async fn create_unit(&self, work: WorkRef, available: bool) -> AppResult<LibraryUnit> {
        let (article_id, science_book_id, fiction_book_id) = work.columns();
        let row = sqlx::query_as::<_, LibraryUnitRow>(&format!(
            r#"
            INSERT INTO library_units (article_id, science_book_id, fiction_book_id, available)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            UNIT_COLUMNS
        ))
        .bind(article_id)
        .bind(science_book_id)
        .bind(fiction_book_id)
        .bind(available)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn get_unit(&self, id: i32) -> AppResult<Option<LibraryUnit>> {
        sqlx::query_as::<_, LibraryUnitRow>(&format!(
            "SELECT {} FROM library_units WHERE id = $1",
            UNIT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(LibraryUnit::try_from)
        .transpose()
    }

    async fn list_units(&self) -> AppResult<Vec<LibraryUnit>> {
        sqlx::query_as::<_, LibraryUnitRow>(&format!(
            "SELECT {} FROM library_units ORDER BY id",
            UNIT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(LibraryUnit::try_from)
        .collect()
    }

    async fn delete_unit(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM library_units WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn issue(
        &self,
        unit_id: i32,
        account_id: i32,
        issued_at: DateTime<Utc>,
        return_due: DateTime<Utc>,
    ) -> AppResult<UnitStatus> {
        let mut tx = self.pool.begin().await?;

        // Claim the unit; only one concurrent issuer gets the row back.
        let claimed: Option<i32> = sqlx::query_scalar(
            "UPDATE library_units SET available = FALSE WHERE id = $1 AND available RETURNING id",
        )
        .bind(unit_id)
        .fetch_optional(&mut *tx)
        .await?;

        if claimed.is_none() {
            let exists = Self::unit_exists(&mut tx, unit_id).await?;
            tx.rollback().await?;
            return Err(if exists {
                AppError::Conflict(format!("Library unit {} is not available", unit_id))
            } else {
                unit_not_found(unit_id)
            });
        }

        let status = sqlx::query_as::<_, UnitStatus>(&format!(
            r#"
            INSERT INTO unit_statuses (account_id, unit_id, issued_at, return_due)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            STATUS_COLUMNS
        ))
        .bind(account_id)
        .bind(unit_id)
        .bind(issued_at)
        .bind(return_due)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(status)
    }

    async fn return_unit(&self, unit_id: i32, returned_at: DateTime<Utc>) -> AppResult<UnitStatus> {
        let mut tx = self.pool.begin().await?;

        let closed = sqlx::query_as::<_, UnitStatus>(&format!(
            r#"
            UPDATE unit_statuses SET returned_at = $1
            WHERE unit_id = $2 AND returned_at IS NULL
            RETURNING {}
            "#,
            STATUS_COLUMNS
        ))
        .bind(returned_at)
        .bind(unit_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(status) = closed else {
            let exists = Self::unit_exists(&mut tx, unit_id).await?;
            tx.rollback().await?;
            return Err(if exists {
                AppError::Conflict(format!("Library unit {} is not issued", unit_id))
            } else {
                unit_not_found(unit_id)
            });
        };

        sqlx::query("UPDATE library_units SET available = TRUE WHERE id = $1")
            .bind(unit_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(status)
    }

    async fn statuses_for_account(&self, account_id: i32) -> AppResult<Vec<UnitStatus>> {
        let statuses = sqlx::query_as::<_, UnitStatus>(&format!(
            "SELECT {} FROM unit_statuses WHERE account_id = $1 ORDER BY issued_at DESC, id DESC",
            STATUS_COLUMNS
        ))
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(statuses)
    }
}
