//! Referral tree: ancestor chains and per-user referral profiles.

use crate::domain::UserId;
use serde::{Deserialize, Serialize};

/// Deepest generation that can earn a commission (exclusive bound).
pub const MAX_GENERATIONS: usize = 20;

/// VIP tier thresholds on the lifetime direct-referral count, highest first.
const VIP_THRESHOLDS: [(i64, i64); 5] = [(10, 5), (8, 4), (6, 3), (4, 2), (2, 1)];

/// Ordered ancestors of a user, root first and direct referrer last.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferralChain(Vec<UserId>);

impl ReferralChain {
    pub fn new(ancestors: Vec<UserId>) -> Self {
        ReferralChain(ancestors)
    }

    pub fn root() -> Self {
        ReferralChain(Vec::new())
    }

    pub fn ancestors(&self) -> &[UserId] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn direct_referrer(&self) -> Option<UserId> {
        self.0.last().copied()
    }

    /// Ancestors paired with their generation index, direct referrer first,
    /// capped at [`MAX_GENERATIONS`].
    pub fn generations(&self) -> impl Iterator<Item = (usize, UserId)> + '_ {
        self.0.iter().rev().copied().enumerate().take(MAX_GENERATIONS)
    }

    /// Chain of a user referred by `referrer`, whose own chain is `self`.
    pub fn extended_with(&self, referrer: UserId) -> ReferralChain {
        let mut ancestors = self.0.clone();
        ancestors.push(referrer);
        ReferralChain(ancestors)
    }

    pub fn contains(&self, user: UserId) -> bool {
        self.0.contains(&user)
    }

    /// Decode a stored chain (a JSON array of ids, root first).
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        if raw.trim().is_empty() {
            return Ok(ReferralChain::root());
        }
        serde_json::from_str(raw)
    }

    /// Stored form of the chain, the inverse of [`ReferralChain::parse`].
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Referral counters of one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralProfile {
    pub user_id: UserId,
    pub vip: i64,
    /// Lifetime count of direct referrals that received a placement.
    pub history_recommend: i64,
}

impl ReferralProfile {
    pub fn new(user_id: UserId) -> Self {
        ReferralProfile {
            user_id,
            vip: 0,
            history_recommend: 0,
        }
    }

    /// Count one more first-time referral and recompute the VIP tier.
    pub fn record_referral(&mut self) {
        self.history_recommend += 1;
        self.vip = vip_for_history(self.history_recommend);
    }

    /// Operator override: jump straight to `vip`, aligning the counter with the
    /// tier's threshold. Unknown tiers leave the profile untouched.
    pub fn force_vip(&mut self, vip: i64) -> bool {
        match VIP_THRESHOLDS.iter().find(|(_, tier)| *tier == vip) {
            Some((threshold, tier)) => {
                self.vip = *tier;
                self.history_recommend = *threshold;
                true
            }
            None => false,
        }
    }
}

/// VIP tier for a lifetime direct-referral count.
pub fn vip_for_history(history_recommend: i64) -> i64 {
    VIP_THRESHOLDS
        .iter()
        .find(|(threshold, _)| history_recommend >= *threshold)
        .map(|(_, tier)| *tier)
        .unwrap_or(0)
}
