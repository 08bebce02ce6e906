//! Area-tier pool distribution.

use super::commission::{pay_to_active_position, RewardTag};
use super::{BatchReport, EngineError, ItemOutcome, RewardEngine};
use crate::domain::rates::AREA_TIERS;
use crate::domain::{
    Amount, AreaAmount, Position, RateSnapshot, ReferralChain, RewardKind, RewardSplit, TimeMs,
    UserId,
};
use crate::engine::{net_area_amount, tier_share, tiers_reached, TierMembership};
use tracing::{info, warn};

const DAY_MINUTES: i64 = 24 * 60;

/// Which settlement day feeds the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PoolDay {
    #[default]
    Yesterday,
    Today,
}

impl PoolDay {
    fn offset(self) -> i64 {
        match self {
            PoolDay::Yesterday => -1,
            PoolDay::Today => 0,
        }
    }
}

impl RewardEngine {
    /// Sum of principals of positions that stopped during `day`.
    pub async fn area_pool(&self, day: PoolDay, now: TimeMs) -> Result<Amount, EngineError> {
        let from = now.business_day_start(self.settings.business_utc_offset_hours, day.offset());
        let to = from.plus_minutes(DAY_MINUTES);
        let matured = self.repo.positions_stopped_between(from, to).await?;
        Ok(matured.iter().map(Position::principal).sum())
    }

    /// Assign every user to the area tiers it qualifies for.
    pub async fn classify_area_tiers(&self, rates: &RateSnapshot) -> Result<TierMembership, EngineError> {
        let mut membership = TierMembership::new();
        for user in self.repo.user_ids().await? {
            let level = self
                .repo
                .user_area(user)
                .await?
                .map(|a| a.level)
                .unwrap_or(0);
            if level > 0 {
                membership.grant(user, level as usize);
                continue;
            }

            let children = self.repo.child_areas(user).await?;
            let area = net_area_amount(&children);
            membership.grant_tiers(user, &tiers_reached(area, rates));
        }
        Ok(membership)
    }

    /// Split the pool of `day` across the area tiers.
    ///
    /// An empty pool is a no-op that yields an empty report.
    pub async fn run_area_reward(&self, day: PoolDay, now: TimeMs) -> Result<BatchReport, EngineError> {
        let rates = self.repo.load_rate_snapshot().await?;
        let mut report = BatchReport::new("area_reward");

        let pool = self.area_pool(day, now).await?;
        if !pool.is_positive() {
            info!(run_id = %report.run_id, "Area pool empty, nothing to distribute");
            return Ok(report);
        }

        let membership = self.classify_area_tiers(&rates).await?;
        info!(run_id = %report.run_id, pool = %pool, "Area reward started");

        for tier in 0..AREA_TIERS {
            let share = tier_share(pool, rates.area_rates[tier], membership.len(tier));
            let split = rates.split(share);
            for user in membership.members(tier) {
                let key = format!("tier{}:user{}", tier + 1, user);
                if !share.is_positive() {
                    report.push(key, ItemOutcome::Skipped("zero share".to_string()));
                    continue;
                }
                let outcome = match self.pay_area_share(user, split, now).await {
                    Ok(true) => ItemOutcome::Applied,
                    Ok(false) => ItemOutcome::Skipped("no position".to_string()),
                    Err(e) => {
                        warn!(user_id = %user, tier = tier + 1, error = %e, "Area share failed");
                        ItemOutcome::Failed(e.to_string())
                    }
                };
                report.push(key, outcome);
            }
        }

        info!(
            run_id = %report.run_id,
            applied = report.applied(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Area reward finished"
        );
        Ok(report)
    }

    /// Recompute every user's area aggregates from its positions and chains.
    ///
    /// `self_amount` is the area value of the user's own positions and
    /// `amount` that of every descendant's. Each user is written in its own
    /// transaction; levels are left alone.
    pub async fn rebuild_area_aggregates(&self) -> Result<BatchReport, EngineError> {
        let mut report = BatchReport::new("area_rebuild");

        let mut chains = Vec::new();
        for (user, raw) in self.repo.chain_texts().await? {
            match ReferralChain::parse(&raw) {
                Ok(chain) => chains.push((user, chain)),
                Err(e) => {
                    warn!(user_id = %user, error = %e, "Malformed chain, user left out of rebuild");
                    report.push(format!("user:{}", user), ItemOutcome::Failed(e.to_string()));
                }
            }
        }

        let mut own = Vec::with_capacity(chains.len());
        for (user, _) in &chains {
            let positions = self.repo.positions_for_user(*user).await?;
            let value: AreaAmount = positions.iter().map(|p| p.principal().to_area()).sum();
            own.push((*user, value));
        }

        for (user, self_amount) in &own {
            let amount: AreaAmount = chains
                .iter()
                .zip(&own)
                .filter(|((_, chain), _)| chain.contains(*user))
                .map(|(_, (_, value))| *value)
                .sum();
            let outcome = match self.store_area_totals(*user, amount, *self_amount).await {
                Ok(()) => ItemOutcome::Applied,
                Err(e) => {
                    warn!(user_id = %user, error = %e, "Area rebuild failed");
                    ItemOutcome::Failed(e.to_string())
                }
            };
            report.push(format!("user:{}", user), outcome);
        }

        info!(
            run_id = %report.run_id,
            applied = report.applied(),
            failed = report.failed(),
            "Area rebuild finished"
        );
        Ok(report)
    }

    async fn store_area_totals(
        &self,
        user: UserId,
        amount: AreaAmount,
        self_amount: AreaAmount,
    ) -> Result<(), EngineError> {
        let mut uow = self.repo.begin().await?;
        uow.set_area_totals(user, amount, self_amount).await?;
        uow.commit().await?;
        Ok(())
    }

    async fn pay_area_share(
        &self,
        user: UserId,
        split: RewardSplit,
        now: TimeMs,
    ) -> Result<bool, EngineError> {
        let mut uow = self.repo.begin().await?;
        let tag = RewardTag {
            kind: RewardKind::AreaPool,
            source_position_id: None,
            profile: None,
        };
        let credited = pay_to_active_position(&mut uow, user, split, tag, now).await?;
        uow.commit().await?;
        Ok(credited.is_some())
    }
}
