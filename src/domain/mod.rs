//! Domain types for the position ledger.
//!
//! This module provides:
//! - Fixed-point amounts (10^10 money scale, 10^5 area scale)
//! - Domain primitives: TimeMs, UserId, PositionId, Address
//! - The position state machine and active-position selection
//! - Referral chains, referral profiles and VIP tiers
//! - The immutable rate snapshot resolved from configuration

pub mod amount;
pub mod area;
pub mod deposit;
pub mod ledger;
pub mod position;
pub mod primitives;
pub mod rates;
pub mod referral;

pub use amount::{Amount, AmountParseError, AreaAmount};
pub use area::UserArea;
pub use deposit::DepositEvent;
pub use ledger::RewardKind;
pub use position::{select_active, CreditOutcome, Position, PositionStatus};
pub use primitives::{Address, PositionId, TimeMs, UserId};
pub use rates::{RateSnapshot, RewardSplit};
pub use referral::{vip_for_history, ReferralChain, ReferralProfile, MAX_GENERATIONS};
