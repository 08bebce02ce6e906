//! Wallet ledger: balances, reward rows and the deposit audit trail.

use crate::domain::{
    Amount, DepositEvent, PositionId, PositionStatus, RewardKind, TimeMs, UserId,
};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{Repository, UnitOfWork};

/// Wallet balances of one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalanceRow {
    pub user_id: UserId,
    pub usdt: Amount,
    pub coin: Amount,
}

/// A persisted reward row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewardRow {
    pub id: i64,
    pub user_id: UserId,
    pub amount: Amount,
    pub coin_amount: Amount,
    pub kind: RewardKind,
    pub source_position_id: Option<PositionId>,
    /// Status of the credited position before the credit.
    pub position_status: Option<PositionStatus>,
    /// Earner's VIP tier when paid (commission rows only).
    pub vip: Option<i64>,
    pub history_recommend: Option<i64>,
    pub created_at: TimeMs,
}

/// Reward row to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReward {
    pub user_id: UserId,
    pub amount: Amount,
    pub coin_amount: Amount,
    pub kind: RewardKind,
    pub source_position_id: Option<PositionId>,
    pub position_status: Option<PositionStatus>,
    pub vip: Option<i64>,
    pub history_recommend: Option<i64>,
    pub created_at: TimeMs,
}

fn reward_from_row(row: &SqliteRow) -> Result<RewardRow, sqlx::Error> {
    let kind: String = row.try_get("kind")?;
    let kind = kind
        .parse::<RewardKind>()
        .map_err(|e| sqlx::Error::Decode(e.into()))?;
    let position_status = row
        .try_get::<Option<String>, _>("position_status")?
        .map(|s| s.parse::<PositionStatus>())
        .transpose()
        .map_err(|e| sqlx::Error::Decode(e.into()))?;

    Ok(RewardRow {
        id: row.try_get("id")?,
        user_id: UserId::new(row.try_get("user_id")?),
        amount: Amount::from_scaled(row.try_get("amount")?),
        coin_amount: Amount::from_scaled(row.try_get("coin_amount")?),
        kind,
        source_position_id: row
            .try_get::<Option<i64>, _>("source_position_id")?
            .map(PositionId::new),
        position_status,
        vip: row.try_get("vip")?,
        history_recommend: row.try_get("history_recommend")?,
        created_at: TimeMs::new(row.try_get("created_at")?),
    })
}

impl Repository {
    /// Current wallet balances; zero for a user that was never credited.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn balance_of(&self, user: UserId) -> Result<BalanceRow, sqlx::Error> {
        let row = sqlx::query("SELECT balance_usdt, balance_coin FROM balances WHERE user_id = ?")
            .bind(user.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => Ok(BalanceRow {
                user_id: user,
                usdt: Amount::from_scaled(r.try_get("balance_usdt")?),
                coin: Amount::from_scaled(r.try_get("balance_coin")?),
            }),
            None => Ok(BalanceRow {
                user_id: user,
                usdt: Amount::ZERO,
                coin: Amount::ZERO,
            }),
        }
    }

    /// Reward rows of a user in insertion order.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn rewards_for_user(&self, user: UserId) -> Result<Vec<RewardRow>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, amount, coin_amount, kind, source_position_id,
                   position_status, vip, history_recommend, created_at
            FROM rewards
            WHERE user_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(user.as_i64())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(reward_from_row).collect()
    }

    /// Whether a deposit event with this key was already applied.
    pub async fn is_deposit_recorded(&self, event_key: &str) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM deposit_records WHERE event_key = ?")
            .bind(event_key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Number of deposit events recorded so far.
    pub async fn deposit_record_count(&self) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM deposit_records")
            .fetch_one(&self.pool)
            .await?;
        row.try_get("cnt")
    }
}

impl UnitOfWork {
    /// Add to a user's wallet, creating the balance row on first credit.
    ///
    /// # Errors
    /// Returns an error if the upsert fails.
    pub async fn credit_balance(
        &mut self,
        user: UserId,
        usdt: Amount,
        coin: Amount,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO balances (user_id, balance_usdt, balance_coin)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                balance_usdt = balance_usdt + excluded.balance_usdt,
                balance_coin = balance_coin + excluded.balance_coin
            "#,
        )
        .bind(user.as_i64())
        .bind(usdt.raw())
        .bind(coin.raw())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    /// Append a reward row and return its id.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn record_reward(&mut self, reward: &NewReward) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO rewards
            (user_id, amount, coin_amount, kind, source_position_id, position_status, vip, history_recommend, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(reward.user_id.as_i64())
        .bind(reward.amount.raw())
        .bind(reward.coin_amount.raw())
        .bind(reward.kind.as_str())
        .bind(reward.source_position_id.map(|id| id.as_i64()))
        .bind(reward.position_status.map(|s| s.as_str()))
        .bind(reward.vip)
        .bind(reward.history_recommend)
        .bind(reward.created_at.as_ms())
        .execute(&mut *self.tx)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Record a processed deposit event. `position` is `None` for an event
    /// that was consumed without opening a position. The event key is unique,
    /// so recording the same event twice fails.
    ///
    /// # Errors
    /// Returns an error if the insert fails or the event was already recorded.
    pub async fn insert_deposit_record(
        &mut self,
        event: &DepositEvent,
        position: Option<PositionId>,
        now: TimeMs,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO deposit_records
            (event_key, user_id, amount, raw_amount, coin_type, position_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.event_key)
        .bind(event.user_id.as_i64())
        .bind(event.amount.raw())
        .bind(&event.raw_amount)
        .bind(&event.coin_type)
        .bind(position.map(|id| id.as_i64()))
        .bind(now.as_ms())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::setup_test_db;
    use super::NewReward;
    use crate::domain::{
        Address, Amount, DepositEvent, PositionId, PositionStatus, RewardKind, TimeMs, UserId,
    };

    #[tokio::test]
    async fn test_credit_balance_accumulates() {
        let (repo, _temp) = setup_test_db().await;
        let user = UserId::new(42);

        let mut uow = repo.begin().await.unwrap();
        uow.credit_balance(user, Amount::from_units(3), Amount::from_units(1))
            .await
            .unwrap();
        uow.credit_balance(user, Amount::from_units(2), Amount::ZERO)
            .await
            .unwrap();
        uow.commit().await.unwrap();

        let balance = repo.balance_of(user).await.unwrap();
        assert_eq!(balance.usdt, Amount::from_units(5));
        assert_eq!(balance.coin, Amount::from_units(1));

        let untouched = repo.balance_of(UserId::new(7)).await.unwrap();
        assert_eq!(untouched.usdt, Amount::ZERO);
    }

    #[tokio::test]
    async fn test_reward_row_round_trip() {
        let (repo, _temp) = setup_test_db().await;
        let user = UserId::new(1);

        let mut uow = repo.begin().await.unwrap();
        uow.record_reward(&NewReward {
            user_id: user,
            amount: Amount::from_units(4),
            coin_amount: Amount::from_units(1),
            kind: RewardKind::RecommendTeam,
            source_position_id: Some(PositionId::new(9)),
            position_status: Some(PositionStatus::Running),
            vip: Some(2),
            history_recommend: Some(4),
            created_at: TimeMs::new(77),
        })
        .await
        .unwrap();
        uow.commit().await.unwrap();

        let rows = repo.rewards_for_user(user).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, RewardKind::RecommendTeam);
        assert_eq!(rows[0].position_status, Some(PositionStatus::Running));
        assert_eq!(rows[0].vip, Some(2));
        assert_eq!(rows[0].source_position_id, Some(PositionId::new(9)));
    }

    #[tokio::test]
    async fn test_deposit_record_is_unique_per_event() {
        let (repo, _temp) = setup_test_db().await;
        let user = repo
            .register_user(&Address::new("0xabc".to_string()), None, TimeMs::new(1))
            .await
            .unwrap();
        let event = DepositEvent::new(
            user,
            Amount::from_units(50),
            "50".to_string(),
            "USDT".to_string(),
            TimeMs::new(10),
            Some("0xfeed".to_string()),
        );

        let mut uow = repo.begin().await.unwrap();
        uow.insert_deposit_record(&event, Some(PositionId::new(3)), TimeMs::new(11))
            .await
            .unwrap();
        uow.commit().await.unwrap();

        let mut uow = repo.begin().await.unwrap();
        let second = uow
            .insert_deposit_record(&event, None, TimeMs::new(12))
            .await;
        assert!(second.is_err());
        drop(uow);

        assert_eq!(repo.deposit_record_count().await.unwrap(), 1);
        assert!(repo.is_deposit_recorded("0xfeed").await.unwrap());
        assert!(!repo.is_deposit_recorded("0xbeef").await.unwrap());
    }
}
