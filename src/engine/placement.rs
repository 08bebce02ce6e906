//! Fixed tier table for operator placements.

use crate::domain::Amount;
use serde::Serialize;

/// What an operator-entered amount buys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdminTier {
    /// Amount as entered by the operator, in display units.
    pub amount: i64,
    pub level: i64,
    pub capacity: Amount,
    /// Value credited to the area aggregates.
    pub principal: Amount,
}

impl AdminTier {
    /// Capacity expressed as a percentage of principal.
    pub fn out_rate(&self) -> i64 {
        if self.principal.is_zero() {
            return 0;
        }
        self.capacity.raw() * 100 / self.principal.raw()
    }
}

/// Tier for an operator-entered amount, `None` for anything off the table.
pub fn admin_tier_for(amount: i64) -> Option<AdminTier> {
    let (level, capacity, principal) = match amount {
        50 => (1, 500, 100),
        100 => (2, 1_500, 300),
        300 => (3, 2_500, 500),
        _ => return None,
    };
    Some(AdminTier {
        amount,
        level,
        capacity: Amount::from_units(capacity),
        principal: Amount::from_units(principal),
    })
}
