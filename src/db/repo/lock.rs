//! The single global job flag.

use sqlx::Row;

use super::Repository;

impl Repository {
    /// Flip the global flag from free to held.
    ///
    /// Returns `false` when another holder already set it.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub async fn try_acquire_global_lock(&self) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE global_lock SET status = 1 WHERE id = 1 AND status = 0")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Clear the global flag regardless of who set it.
    pub async fn release_global_lock(&self) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE global_lock SET status = 0 WHERE id = 1")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn global_lock_held(&self) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT status FROM global_lock WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>("status")? != 0)
    }
}
