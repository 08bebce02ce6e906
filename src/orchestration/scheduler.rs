//! Background deposit scanning.

use super::RewardEngine;
use crate::datasource::DepositSource;
use crate::domain::TimeMs;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Run a deposit scan every `interval` until the task is aborted.
pub fn spawn_deposit_scanner(
    engine: Arc<RewardEngine>,
    source: Arc<dyn DepositSource>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_ms = interval.as_millis() as u64, "Deposit scanner started");

        loop {
            ticker.tick().await;
            match engine.scan_deposits(source.as_ref(), TimeMs::now()).await {
                Ok(Some(report)) => info!(
                    run_id = %report.run_id,
                    applied = report.applied(),
                    failed = report.failed(),
                    "Scheduled deposit scan done"
                ),
                Ok(None) => warn!("Scheduled deposit scan skipped, lock busy"),
                Err(e) => warn!(error = %e, "Scheduled deposit scan failed"),
            }
        }
    })
}
