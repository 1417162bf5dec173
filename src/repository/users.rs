//! Accounts repository for database operations

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres};

use super::{conflict_on_unique, AccountRepository};
use crate::{
    error::{AppError, AppResult},
    models::{
        address::NewProfile,
        user::{Account, NewAccount},
    },
};

const ACCOUNT_COLUMNS: &str = "id, username, email, password_hash, is_active, is_staff, date_joined";

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for UsersRepository {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM accounts WHERE id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn get_by_username(&self, username: &str) -> AppResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM accounts WHERE username = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn find_inactive_by_email(&self, email: &str) -> AppResult<Vec<Account>> {
        let accounts = sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM accounts WHERE LOWER(email) = LOWER($1) AND NOT is_active ORDER BY id",
            ACCOUNT_COLUMNS
        ))
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    async fn username_exists(&self, username: &str) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn create_with_profile(&self, account: &NewAccount, profile: &NewProfile) -> AppResult<Account> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO accounts (username, email, password_hash, is_active, is_staff, date_joined)
            VALUES ($1, $2, $3, FALSE, FALSE, $4)
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(conflict_on_unique("A user with that username already exists."))?;

        let user_info_id: i32 = sqlx::query_scalar(
            "INSERT INTO library_user_info (account_id, phone_number) VALUES ($1, $2) RETURNING id",
        )
        .bind(created.id)
        .bind(profile.phone_number)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO library_user_addresses
                (user_info_id, city_id, street_id, building_number, apartment_number)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user_info_id)
        .bind(profile.city_id)
        .bind(profile.street_id)
        .bind(profile.building_number)
        .bind(profile.apartment_number)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn activate(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("UPDATE accounts SET is_active = TRUE WHERE id = $1 AND NOT is_active")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_staff(&self, id: i32, is_staff: bool) -> AppResult<()> {
        let result = sqlx::query("UPDATE accounts SET is_staff = $1 WHERE id = $2")
            .bind(is_staff)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }
}
