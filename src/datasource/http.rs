//! HTTP deposit feed client.

use super::{DepositSource, DepositSourceError};
use crate::domain::{Amount, DepositEvent, TimeMs, UserId};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Deposit source polling `GET {base_url}/deposits/pending`.
///
/// The endpoint returns a JSON array of
/// `{"userId", "amount", "coinType", "time", "hash"}` objects where `amount`
/// is a display-unit decimal string.
#[derive(Debug, Clone)]
pub struct HttpDepositSource {
    client: Client,
    base_url: String,
}

impl HttpDepositSource {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json(&self, path: &str) -> Result<serde_json::Value, DepositSourceError> {
        let url = format!("{}{}", self.base_url, path);
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self.client.get(&url).send().await.map_err(|e| {
                backoff::Error::transient(DepositSourceError::NetworkError(e.to_string()))
            })?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(DepositSourceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(DepositSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(DepositSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response.json::<serde_json::Value>().await.map_err(|e| {
                backoff::Error::permanent(DepositSourceError::ParseError(e.to_string()))
            })
        })
        .await
    }
}

#[async_trait]
impl DepositSource for HttpDepositSource {
    async fn fetch_pending_deposits(&self) -> Result<Vec<DepositEvent>, DepositSourceError> {
        debug!(base_url = %self.base_url, "Fetching pending deposits");

        let response = self.get_json("/deposits/pending").await?;
        let items = response
            .as_array()
            .ok_or_else(|| DepositSourceError::ParseError("Expected array response".to_string()))?;

        let mut events = Vec::with_capacity(items.len());
        for item in items {
            match parse_deposit(item) {
                Ok(event) => events.push(event),
                Err(e) => warn!("Failed to parse deposit: {}", e),
            }
        }
        Ok(events)
    }
}

fn parse_deposit(json: &serde_json::Value) -> Result<DepositEvent, DepositSourceError> {
    let user_id = json
        .get("userId")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| DepositSourceError::ParseError("Missing userId field".to_string()))?;

    let raw_amount = match json.get("amount") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => {
            return Err(DepositSourceError::ParseError(
                "Missing amount field".to_string(),
            ))
        }
    };
    let amount = Amount::parse_display(&raw_amount)
        .map_err(|e| DepositSourceError::ParseError(format!("Invalid amount: {}", e)))?;

    let time_ms = json
        .get("time")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| DepositSourceError::ParseError("Missing time field".to_string()))?;

    let coin_type = json
        .get("coinType")
        .and_then(|v| v.as_str())
        .unwrap_or("USDT")
        .to_string();

    let tx_hash = json
        .get("hash")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    Ok(DepositEvent::new(
        UserId::new(user_id),
        amount,
        raw_amount,
        coin_type,
        TimeMs::new(time_ms),
        tx_hash,
    ))
}
