//! Reward engine orchestration.
//!
//! Each public operation resolves a fresh [`RateSnapshot`](crate::domain::RateSnapshot),
//! opens one [`UnitOfWork`](crate::db::repo::UnitOfWork) per item and hands the
//! arithmetic to [`crate::engine`]. Batch jobs report per-item outcomes and
//! never stop at the first failing item.

pub mod area;
pub mod commission;
pub mod daily;
pub mod deposit;
pub mod lock;
pub mod overrides;
pub mod placement;
pub mod report;
pub mod scheduler;

use crate::config::Config;
use crate::datasource::DepositSourceError;
use crate::db::Repository;
use crate::domain::UserId;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use lock::GlobalLock;
pub use placement::PlacementSummary;
pub use report::{BatchItem, BatchReport, ItemOutcome};
pub use scheduler::spawn_deposit_scanner;

/// Runtime knobs of the engine that do not live in the `configs` table.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub lock_attempts: u32,
    pub lock_retry_delay: Duration,
    pub business_utc_offset_hours: i32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            lock_attempts: 3,
            lock_retry_delay: Duration::from_secs(5),
            business_utc_offset_hours: 8,
        }
    }
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            lock_attempts: config.lock_attempts,
            lock_retry_delay: config.lock_retry_delay(),
            business_utc_offset_hours: config.business_utc_offset_hours,
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Unrecognized placement amount: {0}")]
    UnrecognizedAmount(i64),
    #[error("User {0} already has a running position")]
    PositionRunning(UserId),
    #[error("Malformed referral chain for user {user}: {reason}")]
    MalformedChain { user: UserId, reason: String },
    #[error("User {0} not found")]
    UserNotFound(UserId),
    #[error("Invalid {field}: {value}")]
    InvalidValue { field: &'static str, value: i64 },
    #[error(transparent)]
    DepositSource(#[from] DepositSourceError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl EngineError {
    /// Business rule rejections, as opposed to collaborator failures.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EngineError::UnrecognizedAmount(_)
                | EngineError::PositionRunning(_)
                | EngineError::MalformedChain { .. }
                | EngineError::UserNotFound(_)
                | EngineError::InvalidValue { .. }
        )
    }
}

/// Entry point for every ledger mutation.
#[derive(Debug, Clone)]
pub struct RewardEngine {
    repo: Arc<Repository>,
    settings: EngineSettings,
    lock: GlobalLock,
}

impl RewardEngine {
    pub fn new(repo: Arc<Repository>, settings: EngineSettings) -> Self {
        let lock = GlobalLock::new(
            repo.clone(),
            settings.lock_attempts,
            settings.lock_retry_delay,
        );
        Self {
            repo,
            settings,
            lock,
        }
    }

    pub fn repo(&self) -> &Arc<Repository> {
        &self.repo
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn lock(&self) -> &GlobalLock {
        &self.lock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        assert!(EngineError::UnrecognizedAmount(75).is_validation());
        assert!(EngineError::PositionRunning(UserId::new(1)).is_validation());
        assert!(!EngineError::Db(sqlx::Error::RowNotFound).is_validation());
        assert!(!EngineError::DepositSource(DepositSourceError::RateLimited).is_validation());
    }

    #[test]
    fn test_error_messages() {
        let err = EngineError::MalformedChain {
            user: UserId::new(4),
            reason: "expected value".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed referral chain for user 4: expected value"
        );
        assert_eq!(
            EngineError::UnrecognizedAmount(75).to_string(),
            "Unrecognized placement amount: 75"
        );
    }
}
