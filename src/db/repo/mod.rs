//! Repository layer for database operations.
//!
//! `Repository` owns the pool and serves batch listings and read-only lookups.
//! Every mutation goes through a [`UnitOfWork`], a scoped transaction that
//! rolls back when dropped without `commit`. Methods are organized across
//! submodules by domain:
//! - `positions.rs` - Position store
//! - `ledger.rs` - Wallet balances, reward rows, deposit audit rows
//! - `referrals.rs` - Users, referral chains, profiles and area aggregates
//! - `config.rs` - Rate snapshot resolution
//! - `lock.rs` - Global job lock

mod config;
mod ledger;
mod lock;
mod positions;
mod referrals;

use sqlx::sqlite::{Sqlite, SqlitePool};
use sqlx::Transaction;

pub use ledger::{BalanceRow, NewReward, RewardRow};

/// Repository for database operations.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// Open a unit of work.
    ///
    /// # Errors
    /// Returns an error if a connection cannot be acquired.
    pub async fn begin(&self) -> Result<UnitOfWork, sqlx::Error> {
        Ok(UnitOfWork {
            tx: self.pool.begin().await?,
        })
    }

    /// Cheap connectivity probe used by the readiness endpoint.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// All-or-nothing scope for one engine operation.
///
/// Dropping it without calling [`UnitOfWork::commit`] rolls every write back.
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
}

impl UnitOfWork {
    /// Commit all writes made through this unit of work.
    pub async fn commit(self) -> Result<(), sqlx::Error> {
        self.tx.commit().await
    }

    /// Discard all writes made through this unit of work.
    pub async fn rollback(self) -> Result<(), sqlx::Error> {
        self.tx.rollback().await
    }
}
