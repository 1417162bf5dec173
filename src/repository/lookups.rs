//! Cities and streets lookup tables

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::LookupRepository;
use crate::{
    error::AppResult,
    models::address::{LookupEntry, LookupTable},
};

#[derive(Clone)]
pub struct LookupsRepository {
    pool: Pool<Postgres>,
}

impl LookupsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LookupRepository for LookupsRepository {
    async fn find(&self, table: LookupTable, name: &str) -> AppResult<Option<LookupEntry>> {
        let entry = sqlx::query_as::<_, LookupEntry>(&format!(
            "SELECT id, name FROM {} WHERE name = $1",
            table.table_name()
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    async fn find_or_create(&self, table: LookupTable, name: &str) -> AppResult<LookupEntry> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let entry = sqlx::query_as::<_, LookupEntry>(&format!(
            r#"
            INSERT INTO {} (name) VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name
            "#,
            table.table_name()
        ))
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(entry)
    }

    async fn list(&self, table: LookupTable) -> AppResult<Vec<LookupEntry>> {
        let entries = sqlx::query_as::<_, LookupEntry>(&format!(
            "SELECT id, name FROM {} ORDER BY name",
            table.table_name()
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
