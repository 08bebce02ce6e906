//! Users, referral chains, referral profiles and area aggregates.

use crate::domain::{Address, AreaAmount, ReferralChain, ReferralProfile, TimeMs, UserArea, UserId};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteExecutor};

use super::{Repository, UnitOfWork};

fn profile_from_row(row: &SqliteRow) -> Result<ReferralProfile, sqlx::Error> {
    Ok(ReferralProfile {
        user_id: UserId::new(row.try_get("user_id")?),
        vip: row.try_get("vip")?,
        history_recommend: row.try_get("history_recommend")?,
    })
}

fn area_from_row(row: &SqliteRow) -> Result<UserArea, sqlx::Error> {
    Ok(UserArea {
        user_id: UserId::new(row.try_get("user_id")?),
        amount: AreaAmount(row.try_get("amount")?),
        self_amount: AreaAmount(row.try_get("self_amount")?),
        level: row.try_get("level")?,
    })
}

async fn fetch_chain_text<'e, E>(exec: E, user: UserId) -> Result<Option<String>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query("SELECT chain FROM user_recommends WHERE user_id = ?")
        .bind(user.as_i64())
        .fetch_optional(exec)
        .await?;
    row.map(|r| r.try_get("chain")).transpose()
}

async fn fetch_profile<'e, E>(exec: E, user: UserId) -> Result<Option<ReferralProfile>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query("SELECT user_id, vip, history_recommend FROM user_infos WHERE user_id = ?")
        .bind(user.as_i64())
        .fetch_optional(exec)
        .await?;
    row.as_ref().map(profile_from_row).transpose()
}

async fn fetch_area<'e, E>(exec: E, user: UserId) -> Result<Option<UserArea>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query("SELECT user_id, amount, self_amount, level FROM user_areas WHERE user_id = ?")
        .bind(user.as_i64())
        .fetch_optional(exec)
        .await?;
    row.as_ref().map(area_from_row).transpose()
}

impl Repository {
    /// Create a user under `referrer` (or as a tree root) together with its
    /// referral, profile, area and balance rows.
    ///
    /// The chain is the referrer's chain extended with the referrer.
    ///
    /// # Errors
    /// Returns `RowNotFound` if the referrer is unknown, `Decode` if its
    /// stored chain is malformed, or any database error.
    pub async fn register_user(
        &self,
        address: &Address,
        referrer: Option<UserId>,
        now: TimeMs,
    ) -> Result<UserId, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let chain = match referrer {
            None => ReferralChain::root(),
            Some(parent) => {
                let raw = fetch_chain_text(&mut *tx, parent)
                    .await?
                    .ok_or(sqlx::Error::RowNotFound)?;
                ReferralChain::parse(&raw)
                    .map_err(|e| sqlx::Error::Decode(Box::new(e)))?
                    .extended_with(parent)
            }
        };

        let chain_json = chain
            .to_json()
            .map_err(|e| sqlx::Error::Protocol(format!("chain encoding: {}", e)))?;

        let result = sqlx::query("INSERT INTO users (address, created_at) VALUES (?, ?)")
            .bind(address.as_str())
            .bind(now.as_ms())
            .execute(&mut *tx)
            .await?;
        let user = UserId::new(result.last_insert_rowid());

        sqlx::query(
            "INSERT INTO user_recommends (user_id, referrer_id, chain, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user.as_i64())
        .bind(referrer.map(|r| r.as_i64()))
        .bind(chain_json)
        .bind(now.as_ms())
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO user_infos (user_id) VALUES (?)")
            .bind(user.as_i64())
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO user_areas (user_id) VALUES (?)")
            .bind(user.as_i64())
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT OR IGNORE INTO balances (user_id) VALUES (?)")
            .bind(user.as_i64())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user)
    }

    /// Whether a user with this id exists.
    pub async fn user_exists(&self, user: UserId) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM users WHERE id = ?")
            .bind(user.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Every user id, ascending.
    pub async fn user_ids(&self) -> Result<Vec<UserId>, sqlx::Error> {
        let rows = sqlx::query("SELECT id FROM users ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|r| r.try_get::<i64, _>("id").map(UserId::new))
            .collect()
    }

    /// Every stored chain, undecoded, by ascending user id.
    pub async fn chain_texts(&self) -> Result<Vec<(UserId, String)>, sqlx::Error> {
        let rows = sqlx::query("SELECT user_id, chain FROM user_recommends ORDER BY user_id ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|r| Ok((UserId::new(r.try_get("user_id")?), r.try_get("chain")?)))
            .collect()
    }

    /// Stored chain of a user, undecoded.
    pub async fn chain_text(&self, user: UserId) -> Result<Option<String>, sqlx::Error> {
        fetch_chain_text(&self.pool, user).await
    }

    pub async fn referral_profile(&self, user: UserId) -> Result<Option<ReferralProfile>, sqlx::Error> {
        fetch_profile(&self.pool, user).await
    }

    pub async fn user_area(&self, user: UserId) -> Result<Option<UserArea>, sqlx::Error> {
        fetch_area(&self.pool, user).await
    }

    /// Area aggregates of the direct referrals of `user`.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn child_areas(&self, user: UserId) -> Result<Vec<UserArea>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT a.user_id, a.amount, a.self_amount, a.level
            FROM user_recommends r
            JOIN user_areas a ON a.user_id = r.user_id
            WHERE r.referrer_id = ?
            ORDER BY a.user_id ASC
            "#,
        )
        .bind(user.as_i64())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(area_from_row).collect()
    }

    /// Monthly-recommend audit rows written for `user` as the referrer.
    pub async fn monthly_recommend_count(&self, user: UserId) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM monthly_recommends WHERE user_id = ?")
            .bind(user.as_i64())
            .fetch_one(&self.pool)
            .await?;
        row.try_get("cnt")
    }
}

impl UnitOfWork {
    pub async fn user_exists(&mut self, user: UserId) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM users WHERE id = ?")
            .bind(user.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.is_some())
    }

    /// Stored chain of a user, undecoded.
    pub async fn chain_text(&mut self, user: UserId) -> Result<Option<String>, sqlx::Error> {
        fetch_chain_text(&mut *self.tx, user).await
    }

    pub async fn referral_profile(
        &mut self,
        user: UserId,
    ) -> Result<Option<ReferralProfile>, sqlx::Error> {
        fetch_profile(&mut *self.tx, user).await
    }

    /// Persist VIP tier and referral counter.
    ///
    /// # Errors
    /// Returns an error if the upsert fails.
    pub async fn save_referral_profile(&mut self, profile: &ReferralProfile) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO user_infos (user_id, vip, history_recommend)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                vip = excluded.vip,
                history_recommend = excluded.history_recommend
            "#,
        )
        .bind(profile.user_id.as_i64())
        .bind(profile.vip)
        .bind(profile.history_recommend)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    pub async fn insert_monthly_recommend(
        &mut self,
        referrer: UserId,
        recommended: UserId,
        now: TimeMs,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO monthly_recommends (user_id, recommend_user_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(referrer.as_i64())
        .bind(recommended.as_i64())
        .bind(now.as_ms())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    /// Add to the value a user staked itself.
    pub async fn add_self_area(&mut self, user: UserId, delta: AreaAmount) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO user_areas (user_id, self_amount) VALUES (?, ?)
            ON CONFLICT(user_id) DO UPDATE SET self_amount = self_amount + excluded.self_amount
            "#,
        )
        .bind(user.as_i64())
        .bind(delta.raw())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    /// Add to the down-line value of every listed ancestor.
    pub async fn add_downline_area(
        &mut self,
        ancestors: &[UserId],
        delta: AreaAmount,
    ) -> Result<(), sqlx::Error> {
        for user in ancestors {
            sqlx::query(
                r#"
                INSERT INTO user_areas (user_id, amount) VALUES (?, ?)
                ON CONFLICT(user_id) DO UPDATE SET amount = amount + excluded.amount
                "#,
            )
            .bind(user.as_i64())
            .bind(delta.raw())
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    /// Overwrite both area aggregates of a user, keeping its level.
    pub async fn set_area_totals(
        &mut self,
        user: UserId,
        amount: AreaAmount,
        self_amount: AreaAmount,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO user_areas (user_id, amount, self_amount) VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                amount = excluded.amount,
                self_amount = excluded.self_amount
            "#,
        )
        .bind(user.as_i64())
        .bind(amount.raw())
        .bind(self_amount.raw())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    /// Set the manual area tier of a user; 0 clears it.
    pub async fn set_area_level(&mut self, user: UserId, level: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO user_areas (user_id, level) VALUES (?, ?)
            ON CONFLICT(user_id) DO UPDATE SET level = excluded.level
            "#,
        )
        .bind(user.as_i64())
        .bind(level)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }
}
