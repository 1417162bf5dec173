//! Contact info and address repository

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::ProfileRepository;
use crate::{
    error::{AppError, AppResult},
    models::address::{AddressDetails, LibraryUserAddress, LibraryUserInfo, ProfileUpdate},
};

#[derive(Clone)]
pub struct ProfilesRepository {
    pool: Pool<Postgres>,
}

impl ProfilesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for ProfilesRepository {
    async fn get_info(&self, account_id: i32) -> AppResult<Option<LibraryUserInfo>> {
        let info = sqlx::query_as::<_, LibraryUserInfo>(
            "SELECT id, account_id, phone_number FROM library_user_info WHERE account_id = $1",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(info)
    }

    async fn get_address(&self, user_info_id: i32) -> AppResult<Option<LibraryUserAddress>> {
        let address = sqlx::query_as::<_, LibraryUserAddress>(
            r#"
            SELECT id, user_info_id, city_id, street_id, building_number, apartment_number
            FROM library_user_addresses
            WHERE user_info_id = $1
            "#,
        )
        .bind(user_info_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(address)
    }

    async fn get_address_details(&self, user_info_id: i32) -> AppResult<Option<AddressDetails>> {
        let details = sqlx::query_as::<_, AddressDetails>(
            r#"
            SELECT a.building_number, a.apartment_number, c.name AS city, s.name AS street
            FROM library_user_addresses a
            JOIN cities c ON c.id = a.city_id
            JOIN streets s ON s.id = a.street_id
            WHERE a.user_info_id = $1
            "#,
        )
        .bind(user_info_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(details)
    }

    async fn apply_update(&self, update: &ProfileUpdate) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        if let Some(email) = &update.email {
            let result = sqlx::query("UPDATE accounts SET email = $1 WHERE id = $2")
                .bind(email)
                .bind(update.account_id)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() == 0 {
                return Err(AppError::NotFound(format!("User with id {} not found", update.account_id)));
            }
        }

        if let Some(phone_number) = update.phone_number {
            let result = sqlx::query("UPDATE library_user_info SET phone_number = $1 WHERE id = $2")
                .bind(phone_number)
                .bind(update.user_info_id)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() == 0 {
                return Err(AppError::NotFound(format!("Contact info {} not found", update.user_info_id)));
            }
        }

        if let Some(address) = &update.address {
            let result = sqlx::query(
                r#"
                UPDATE library_user_addresses
                SET city_id = $1, street_id = $2, building_number = $3, apartment_number = $4
                WHERE id = $5
                "#,
            )
            .bind(address.city_id)
            .bind(address.street_id)
            .bind(address.building_number)
            .bind(address.apartment_number)
            .bind(address.id)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(AppError::NotFound(format!("Address {} not found", address.id)));
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
