//! Position record and its accumulation/completion state machine.

use crate::domain::{Amount, PositionId, TimeMs, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    /// Still accumulating towards its capacity.
    Running,
    /// Reached capacity; `stop_date` is set.
    Stopped,
}

impl PositionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionStatus::Running => "running",
            PositionStatus::Stopped => "stop",
        }
    }
}

impl fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PositionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(PositionStatus::Running),
            "stop" | "stopped" => Ok(PositionStatus::Stopped),
            other => Err(format!("unknown position status: {}", other)),
        }
    }
}

/// Staked capital placed into the matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Zero until the record is persisted.
    pub id: PositionId,
    pub user_id: UserId,
    pub status: PositionStatus,
    /// Accumulated value.
    pub current: Amount,
    /// Capacity.
    pub current_max: Amount,
    /// Payout multiplier as a percentage (300 = 3x).
    pub out_rate: i64,
    /// Coin-denominated accrual.
    pub stop_coin: Amount,
    /// Admin tier level, 0 for deposit placements.
    pub level: i64,
    /// Set once the overflow of this position has seeded a newer one.
    pub carried_over: bool,
    pub stop_date: Option<TimeMs>,
    pub created_at: TimeMs,
}

/// Result of applying a credit to a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditOutcome {
    /// Status before the credit, recorded on reward rows.
    pub previous_status: PositionStatus,
    /// True when this credit performed the Running→Stopped transition.
    pub stopped_now: bool,
}

impl Position {
    /// Open a new position seeded with carry-over.
    ///
    /// A seed that already covers the capacity yields a Stopped position.
    pub fn open(
        user_id: UserId,
        seed: Amount,
        cap: Amount,
        out_rate: i64,
        level: i64,
        now: TimeMs,
    ) -> Self {
        let (status, stop_date) = if seed >= cap {
            (PositionStatus::Stopped, Some(now))
        } else {
            (PositionStatus::Running, None)
        };
        Position {
            id: PositionId::new(0),
            user_id,
            status,
            current: seed,
            current_max: cap,
            out_rate,
            stop_coin: Amount::ZERO,
            level,
            carried_over: false,
            stop_date,
            created_at: now,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == PositionStatus::Running
    }

    /// Original principal: `current_max * 100 / out_rate`.
    pub fn principal(&self) -> Amount {
        self.current_max.mul_div(100, self.out_rate)
    }

    /// Amount accumulated beyond capacity, zero when not exceeded.
    pub fn overflow(&self) -> Amount {
        if self.current > self.current_max {
            self.current - self.current_max
        } else {
            Amount::ZERO
        }
    }

    /// Add `amount` and `coin_amount`.
    ///
    /// Only a Running position can stop; a Stopped one keeps growing without
    /// its stop date moving. Overshoot is kept as-is.
    pub fn credit(&mut self, amount: Amount, coin_amount: Amount, now: TimeMs) -> CreditOutcome {
        let previous_status = self.status;
        self.current += amount;
        self.stop_coin += coin_amount;

        let stopped_now = previous_status == PositionStatus::Running && self.current >= self.current_max;
        if stopped_now {
            self.status = PositionStatus::Stopped;
            if self.stop_date.is_none() {
                self.stop_date = Some(now);
            }
        }

        CreditOutcome {
            previous_status,
            stopped_now,
        }
    }
}

/// Pick the position a reward lands on: the first Running one, else the most
/// recent. `positions` must be ordered newest first.
pub fn select_active(positions: &[Position]) -> Option<&Position> {
    positions
        .iter()
        .find(|p| p.is_running())
        .or_else(|| positions.first())
}
