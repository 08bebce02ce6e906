//! Area-tier classification and fee-pool split.

use crate::domain::rates::AREA_TIERS;
use crate::domain::amount::AREA_DIVISOR;
use crate::domain::{Amount, AreaAmount, RateSnapshot, UserArea, UserId};
use std::collections::BTreeSet;

/// Down-line value net of the single largest branch.
///
/// `children` are the direct referrals' aggregates; the user's own stake is
/// not part of it.
pub fn net_area_amount(children: &[UserArea]) -> AreaAmount {
    let total: AreaAmount = children.iter().map(UserArea::branch_total).sum();
    let largest = children
        .iter()
        .map(UserArea::branch_total)
        .max()
        .unwrap_or(AreaAmount::ZERO);
    total - largest
}

/// Tiers (0-based) whose threshold `area` meets. Each tier is checked on its
/// own, so an unset threshold (0) admits every user.
pub fn tiers_reached(area: AreaAmount, rates: &RateSnapshot) -> Vec<usize> {
    (0..AREA_TIERS)
        .filter(|tier| area >= rates.area_threshold(*tier))
        .collect()
}

/// Members of each tier, in user-id order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierMembership {
    tiers: [BTreeSet<UserId>; AREA_TIERS],
}

impl TierMembership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `user` membership of tiers `1..=level`.
    pub fn grant(&mut self, user: UserId, level: usize) {
        for tier in self.tiers.iter_mut().take(level.min(AREA_TIERS)) {
            tier.insert(user);
        }
    }

    /// Grant `user` membership of each listed tier (0-based).
    pub fn grant_tiers(&mut self, user: UserId, tiers: &[usize]) {
        for &tier in tiers {
            if let Some(members) = self.tiers.get_mut(tier) {
                members.insert(user);
            }
        }
    }

    /// Members of tier `index` (0-based).
    pub fn members(&self, index: usize) -> impl Iterator<Item = UserId> + '_ {
        self.tiers[index].iter().copied()
    }

    pub fn len(&self, index: usize) -> usize {
        self.tiers[index].len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.iter().all(BTreeSet::is_empty)
    }
}

/// Per-member share of `pool` for one tier.
///
/// The pool is truncated to the area scale before splitting and the share is
/// lifted back afterwards, so shares are multiples of 10^5.
pub fn tier_share(pool: Amount, tier_rate: i64, members: usize) -> Amount {
    if members == 0 {
        return Amount::ZERO;
    }
    let coarse = Amount::from_scaled(pool.raw() / AREA_DIVISOR);
    let share = coarse.percent(tier_rate).div_count(members);
    Amount::from_scaled(share.raw().saturating_mul(AREA_DIVISOR))
}
