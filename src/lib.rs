pub mod api;
pub mod config;
pub mod datasource;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use config::Config;
pub use datasource::{DepositSource, DepositSourceError, HttpDepositSource, MockDepositSource};
pub use db::{init_db, Repository};
pub use domain::{
    Address, Amount, AreaAmount, DepositEvent, Position, PositionId, PositionStatus, RateSnapshot,
    ReferralChain, RewardKind, TimeMs, UserId,
};
pub use error::AppError;
pub use orchestration::{BatchReport, EngineError, EngineSettings, ItemOutcome, RewardEngine};
