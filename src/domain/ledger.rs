//! Wallet ledger row kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Why a balance moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    /// Raw external deposit.
    Deposit,
    /// Overflow of stopped positions paid back on re-placement.
    CarryOver,
    /// Generation-0 bonus paid at deposit time.
    RecommendFirst,
    /// Cascading commission from a daily maturity reward.
    RecommendTeam,
    /// Daily maturity reward on the user's own position.
    DailyPosition,
    /// Area-tier share of the fee pool.
    AreaPool,
}

impl RewardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RewardKind::Deposit => "deposit",
            RewardKind::CarryOver => "carry_over",
            RewardKind::RecommendFirst => "recommend_first",
            RewardKind::RecommendTeam => "recommend_team",
            RewardKind::DailyPosition => "daily_position",
            RewardKind::AreaPool => "area_pool",
        }
    }
}

impl fmt::Display for RewardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RewardKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(RewardKind::Deposit),
            "carry_over" => Ok(RewardKind::CarryOver),
            "recommend_first" => Ok(RewardKind::RecommendFirst),
            "recommend_team" => Ok(RewardKind::RecommendTeam),
            "daily_position" => Ok(RewardKind::DailyPosition),
            "area_pool" => Ok(RewardKind::AreaPool),
            other => Err(format!("unknown reward kind: {}", other)),
        }
    }
}
