//! Per-user area aggregates used for tier classification.

use crate::domain::{AreaAmount, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserArea {
    pub user_id: UserId,
    /// Staked value of the whole down-line.
    pub amount: AreaAmount,
    /// Value staked by the user itself.
    pub self_amount: AreaAmount,
    /// Manual tier override, 0 when unset.
    pub level: i64,
}

impl UserArea {
    pub fn new(user_id: UserId) -> Self {
        UserArea {
            user_id,
            amount: AreaAmount::ZERO,
            self_amount: AreaAmount::ZERO,
            level: 0,
        }
    }

    /// Weight of the branch rooted at this user as seen by its referrer.
    pub fn branch_total(&self) -> AreaAmount {
        self.amount + self.self_amount
    }
}
