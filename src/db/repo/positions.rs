//! Position store operations for the repository.

use crate::domain::{Amount, Position, PositionId, PositionStatus, TimeMs, UserId};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteExecutor};

use super::{Repository, UnitOfWork};

const POSITION_COLUMNS: &str = "id, user_id, status, current, current_max, out_rate, stop_coin, \
                                level, carried_over, stop_date, created_at";

fn position_from_row(row: &SqliteRow) -> Result<Position, sqlx::Error> {
    let status_str: String = row.try_get("status")?;
    let status = status_str
        .parse::<PositionStatus>()
        .map_err(|e| sqlx::Error::Decode(e.into()))?;

    Ok(Position {
        id: PositionId::new(row.try_get("id")?),
        user_id: UserId::new(row.try_get("user_id")?),
        status,
        current: Amount::from_scaled(row.try_get("current")?),
        current_max: Amount::from_scaled(row.try_get("current_max")?),
        out_rate: row.try_get("out_rate")?,
        stop_coin: Amount::from_scaled(row.try_get("stop_coin")?),
        level: row.try_get("level")?,
        carried_over: row.try_get::<i64, _>("carried_over")? != 0,
        stop_date: row.try_get::<Option<i64>, _>("stop_date")?.map(TimeMs::new),
        created_at: TimeMs::new(row.try_get("created_at")?),
    })
}

async fn positions_by_user<'e, E>(exec: E, user: UserId) -> Result<Vec<Position>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!(
        "SELECT {} FROM positions WHERE user_id = ? ORDER BY id DESC",
        POSITION_COLUMNS
    );
    let rows = sqlx::query(&sql).bind(user.as_i64()).fetch_all(exec).await?;
    rows.iter().map(position_from_row).collect()
}

impl Repository {
    /// Fetch one position by id.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_position(&self, id: PositionId) -> Result<Option<Position>, sqlx::Error> {
        let sql = format!("SELECT {} FROM positions WHERE id = ?", POSITION_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(position_from_row).transpose()
    }

    /// All positions of a user, newest first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn positions_for_user(&self, user: UserId) -> Result<Vec<Position>, sqlx::Error> {
        positions_by_user(&self.pool, user).await
    }

    /// Every Running position, in id order.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn running_positions(&self) -> Result<Vec<Position>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM positions WHERE status = ? ORDER BY id ASC",
            POSITION_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(PositionStatus::Running.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(position_from_row).collect()
    }

    /// Positions whose stop date falls in `[from, to)`, in id order.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn positions_stopped_between(
        &self,
        from: TimeMs,
        to: TimeMs,
    ) -> Result<Vec<Position>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM positions WHERE stop_date >= ? AND stop_date < ? ORDER BY id ASC",
            POSITION_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(from.as_ms())
            .bind(to.as_ms())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(position_from_row).collect()
    }
}

impl UnitOfWork {
    /// Insert a new position and return its id.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_position(&mut self, position: &Position) -> Result<PositionId, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO positions
            (user_id, status, current, current_max, out_rate, stop_coin, level, carried_over, stop_date, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(position.user_id.as_i64())
        .bind(position.status.as_str())
        .bind(position.current.raw())
        .bind(position.current_max.raw())
        .bind(position.out_rate)
        .bind(position.stop_coin.raw())
        .bind(position.level)
        .bind(if position.carried_over { 1 } else { 0 })
        .bind(position.stop_date.map(|t| t.as_ms()))
        .bind(position.created_at.as_ms())
        .execute(&mut *self.tx)
        .await?;

        Ok(PositionId::new(result.last_insert_rowid()))
    }

    /// All positions of a user, newest first, read inside the transaction.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn positions_for_user(&mut self, user: UserId) -> Result<Vec<Position>, sqlx::Error> {
        positions_by_user(&mut *self.tx, user).await
    }

    /// Fetch one position inside the transaction.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_position(&mut self, id: PositionId) -> Result<Option<Position>, sqlx::Error> {
        let sql = format!("SELECT {} FROM positions WHERE id = ?", POSITION_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(position_from_row).transpose()
    }

    /// Persist the accumulation state of a credited position in one write.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub async fn update_position_progress(&mut self, position: &Position) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE positions
            SET status = ?, current = ?, stop_coin = ?, stop_date = ?
            WHERE id = ?
            "#,
        )
        .bind(position.status.as_str())
        .bind(position.current.raw())
        .bind(position.stop_coin.raw())
        .bind(position.stop_date.map(|t| t.as_ms()))
        .bind(position.id.as_i64())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    /// Flag positions whose overflow has been absorbed by a new placement.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub async fn mark_carried_over(&mut self, ids: &[PositionId]) -> Result<(), sqlx::Error> {
        for id in ids {
            sqlx::query("UPDATE positions SET carried_over = 1 WHERE id = ?")
                .bind(id.as_i64())
                .execute(&mut *self.tx)
                .await?;
        }
        Ok(())
    }
}
