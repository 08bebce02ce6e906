//! Rate snapshot resolution from the `configs` table.

use crate::domain::rates::CONFIG_KEYS;
use crate::domain::RateSnapshot;
use sqlx::Row;
use std::collections::HashMap;

use super::{Repository, UnitOfWork};

impl Repository {
    /// Resolve every rate parameter the engine reads into one snapshot.
    ///
    /// # Errors
    /// Returns an error if the query fails. Missing or unparsable values are
    /// not errors; they read as 0.
    pub async fn load_rate_snapshot(&self) -> Result<RateSnapshot, sqlx::Error> {
        let rows = sqlx::query("SELECT key_name, value FROM configs")
            .fetch_all(&self.pool)
            .await?;

        let mut values = HashMap::with_capacity(rows.len());
        for row in rows {
            let key: String = row.try_get("key_name")?;
            if CONFIG_KEYS.contains(&key.as_str()) {
                values.insert(key, row.try_get::<String, _>("value")?);
            }
        }

        Ok(RateSnapshot::from_map(&values))
    }

    /// Insert or replace one config value.
    pub async fn set_config(&self, key: &str, value: &str) -> Result<(), sqlx::Error> {
        let mut uow = self.begin().await?;
        uow.set_config(key, value).await?;
        uow.commit().await
    }
}

impl UnitOfWork {
    pub async fn set_config(&mut self, key: &str, value: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO configs (key_name, value) VALUES (?, ?)
            ON CONFLICT(key_name) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }
}
