//! Deposit scan: turns external deposit events into positions.

use super::placement::{place, PlacementRequest, PlacementSummary};
use super::{BatchReport, EngineError, ItemOutcome, RewardEngine};
use crate::datasource::DepositSource;
use crate::db::repo::NewReward;
use crate::domain::{Amount, DepositEvent, RateSnapshot, RewardKind, TimeMs};
use tracing::{info, warn};

impl RewardEngine {
    /// Apply every pending deposit from `source` under the global lock.
    ///
    /// Returns `Ok(None)` when the lock could not be taken. The lock is
    /// released whether or not the scan succeeds.
    pub async fn scan_deposits(
        &self,
        source: &dyn DepositSource,
        now: TimeMs,
    ) -> Result<Option<BatchReport>, EngineError> {
        if !self.lock.acquire().await? {
            warn!("Deposit scan skipped, global lock busy");
            return Ok(None);
        }

        let result = self.apply_deposit_batch(source, now).await;

        if let Err(e) = self.lock.release().await {
            warn!(error = %e, "Failed to release global lock");
        }
        result.map(Some)
    }

    async fn apply_deposit_batch(
        &self,
        source: &dyn DepositSource,
        now: TimeMs,
    ) -> Result<BatchReport, EngineError> {
        let events = source.fetch_pending_deposits().await?;
        let rates = self.repo.load_rate_snapshot().await?;
        let mut report = BatchReport::new("deposit_scan");
        info!(run_id = %report.run_id, events = events.len(), "Deposit scan started");

        for event in &events {
            let outcome = self.deposit_outcome(event, &rates, now).await;
            match &outcome {
                ItemOutcome::Applied => {}
                ItemOutcome::Skipped(reason) => {
                    info!(event_key = %event.event_key, user_id = %event.user_id, reason = %reason, "Deposit skipped")
                }
                ItemOutcome::Failed(reason) => {
                    warn!(event_key = %event.event_key, user_id = %event.user_id, reason = %reason, "Deposit failed")
                }
            }
            report.push(event.event_key.clone(), outcome);
        }

        info!(
            run_id = %report.run_id,
            applied = report.applied(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Deposit scan finished"
        );
        Ok(report)
    }

    async fn deposit_outcome(
        &self,
        event: &DepositEvent,
        rates: &RateSnapshot,
        now: TimeMs,
    ) -> ItemOutcome {
        if !event.amount.is_positive() {
            return ItemOutcome::Skipped("non-positive amount".to_string());
        }
        match self.repo.is_deposit_recorded(&event.event_key).await {
            Ok(true) => return ItemOutcome::Skipped("already recorded".to_string()),
            Ok(false) => {}
            Err(e) => return ItemOutcome::Failed(e.to_string()),
        }

        match self.apply_deposit(event, rates, now).await {
            Ok(summary) => {
                info!(
                    event_key = %event.event_key,
                    user_id = %event.user_id,
                    position_id = %summary.position.id,
                    "Deposit placed"
                );
                ItemOutcome::Applied
            }
            Err(e @ EngineError::PositionRunning(_)) => {
                match self.consume_deposit(event, now).await {
                    Ok(()) => ItemOutcome::Skipped(e.to_string()),
                    Err(record_err) => ItemOutcome::Failed(record_err.to_string()),
                }
            }
            Err(e) => ItemOutcome::Failed(e.to_string()),
        }
    }

    /// Mark an event as handled without placing it, so later scans never
    /// apply it once the running position stops.
    async fn consume_deposit(&self, event: &DepositEvent, now: TimeMs) -> Result<(), EngineError> {
        let mut uow = self.repo.begin().await?;
        uow.insert_deposit_record(event, None, now).await?;
        uow.commit().await?;
        Ok(())
    }

    /// Place one deposit in its own unit of work.
    ///
    /// # Errors
    /// Any validation or collaborator error; the unit of work is rolled back.
    pub async fn apply_deposit(
        &self,
        event: &DepositEvent,
        rates: &RateSnapshot,
        now: TimeMs,
    ) -> Result<PlacementSummary, EngineError> {
        let mut uow = self.repo.begin().await?;
        let summary = place(
            &mut uow,
            PlacementRequest {
                user: event.user_id,
                capacity: rates.capacity_for(event.amount),
                out_rate: rates.out_rate,
                level: 0,
                area_value: event.amount,
            },
            rates,
            now,
        )
        .await?;

        uow.credit_balance(event.user_id, event.amount, Amount::ZERO)
            .await?;
        uow.record_reward(&NewReward {
            user_id: event.user_id,
            amount: event.amount,
            coin_amount: Amount::ZERO,
            kind: RewardKind::Deposit,
            source_position_id: Some(summary.position.id),
            position_status: None,
            vip: None,
            history_recommend: None,
            created_at: now,
        })
        .await?;
        uow.insert_deposit_record(event, Some(summary.position.id), now)
            .await?;
        uow.commit().await?;

        Ok(summary)
    }
}
