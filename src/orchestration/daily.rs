//! Daily maturity reward for running positions.

use super::commission::{cascade_commissions, load_chain};
use super::{BatchReport, EngineError, ItemOutcome, RewardEngine};
use crate::db::repo::NewReward;
use crate::domain::{Position, RateSnapshot, RewardKind, TimeMs};
use tracing::{info, warn};

impl RewardEngine {
    /// Reward every Running position with `principal * location_reward_rate / 100`
    /// and cascade the same base up its owner's referral chain.
    ///
    /// One unit of work per position; failures are reported and skipped.
    pub async fn run_daily_position_reward(&self, now: TimeMs) -> Result<BatchReport, EngineError> {
        let rates = self.repo.load_rate_snapshot().await?;
        let running = self.repo.running_positions().await?;
        let mut report = BatchReport::new("daily_position_reward");
        info!(run_id = %report.run_id, positions = running.len(), "Daily position reward started");

        for position in &running {
            let key = format!("position:{}", position.id);
            let outcome = match self.reward_position(position, &rates, now).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(position_id = %position.id, error = %e, "Daily reward failed");
                    ItemOutcome::Failed(e.to_string())
                }
            };
            report.push(key, outcome);
        }

        info!(
            run_id = %report.run_id,
            applied = report.applied(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Daily position reward finished"
        );
        Ok(report)
    }

    async fn reward_position(
        &self,
        listed: &Position,
        rates: &RateSnapshot,
        now: TimeMs,
    ) -> Result<ItemOutcome, EngineError> {
        let base = listed.principal().percent(rates.location_reward_rate);
        if !base.is_positive() {
            return Ok(ItemOutcome::Skipped("zero reward".to_string()));
        }

        let mut uow = self.repo.begin().await?;
        // Re-read: an earlier item of this run may have stopped it. A stopped
        // position still takes this run's credit and keeps its stop date.
        let Some(mut position) = uow.get_position(listed.id).await? else {
            return Ok(ItemOutcome::Skipped("position gone".to_string()));
        };

        let chain = load_chain(&mut uow, position.user_id).await?;
        cascade_commissions(
            &mut uow,
            &chain,
            base,
            &rates.generation_rates,
            RewardKind::RecommendTeam,
            Some(position.id),
            rates,
            now,
        )
        .await?;

        let split = rates.split(base);
        if !split.usdt.is_zero() || !split.coin.is_zero() {
            let outcome = position.credit(split.usdt, split.coin, now);
            uow.update_position_progress(&position).await?;
            uow.credit_balance(position.user_id, split.usdt, split.coin)
                .await?;
            uow.record_reward(&NewReward {
                user_id: position.user_id,
                amount: split.usdt,
                coin_amount: split.coin,
                kind: RewardKind::DailyPosition,
                source_position_id: Some(position.id),
                position_status: Some(outcome.previous_status),
                vip: None,
                history_recommend: None,
                created_at: now,
            })
            .await?;
        }

        uow.commit().await?;
        Ok(ItemOutcome::Applied)
    }
}
