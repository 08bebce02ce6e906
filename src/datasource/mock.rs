//! In-memory deposit source for tests and local runs.

use super::{DepositSource, DepositSourceError};
use crate::domain::DepositEvent;
use async_trait::async_trait;
use std::sync::Mutex;

/// Deposit source that serves a fixed list of events.
///
/// Every fetch returns the whole list, the way an upstream feed keeps
/// redelivering events until they age out.
#[derive(Debug, Default)]
pub struct MockDepositSource {
    deposits: Mutex<Vec<DepositEvent>>,
    failure: Option<DepositSourceError>,
}

impl MockDepositSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deposit(self, deposit: DepositEvent) -> Self {
        self.push(deposit);
        self
    }

    pub fn with_deposits(self, deposits: Vec<DepositEvent>) -> Self {
        for deposit in deposits {
            self.push(deposit);
        }
        self
    }

    /// Make every fetch fail with `error`.
    pub fn failing(error: DepositSourceError) -> Self {
        Self {
            deposits: Mutex::new(Vec::new()),
            failure: Some(error),
        }
    }

    /// Append an event after construction.
    pub fn push(&self, deposit: DepositEvent) {
        if let Ok(mut deposits) = self.deposits.lock() {
            deposits.push(deposit);
        }
    }
}

#[async_trait]
impl DepositSource for MockDepositSource {
    async fn fetch_pending_deposits(&self) -> Result<Vec<DepositEvent>, DepositSourceError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let deposits = self
            .deposits
            .lock()
            .map_err(|e| DepositSourceError::NetworkError(e.to_string()))?;
        Ok(deposits.clone())
    }
}
