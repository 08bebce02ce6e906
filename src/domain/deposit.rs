//! External deposit event.

use crate::domain::{Amount, TimeMs, UserId};
use serde::{Deserialize, Serialize};

/// A confirmed on-chain deposit waiting to be placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositEvent {
    /// Stable unique identifier for this event.
    ///
    /// Priority: `tx_hash` (if present) > hash of deterministic fields.
    pub event_key: String,
    pub user_id: UserId,
    /// Credited amount, scaled by 10^10.
    pub amount: Amount,
    /// Amount as reported upstream, kept verbatim for the audit row.
    pub raw_amount: String,
    pub coin_type: String,
    pub time_ms: TimeMs,
    /// Transaction hash when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

impl DepositEvent {
    /// Create a new event and compute its `event_key`.
    pub fn new(
        user_id: UserId,
        amount: Amount,
        raw_amount: String,
        coin_type: String,
        time_ms: TimeMs,
        tx_hash: Option<String>,
    ) -> Self {
        let tx_hash = normalize_tx_hash(tx_hash);
        let event_key = Self::compute_event_key(user_id, time_ms, amount, tx_hash.as_deref());
        Self {
            event_key,
            user_id,
            amount,
            raw_amount,
            coin_type,
            time_ms,
            tx_hash,
        }
    }

    /// Compute a stable unique key for this event.
    ///
    /// The transaction hash wins when present. Otherwise a SHA-256 digest of
    /// (user, time, amount) truncated to 128 bits is used.
    pub fn compute_event_key(
        user_id: UserId,
        time_ms: TimeMs,
        amount: Amount,
        tx_hash: Option<&str>,
    ) -> String {
        if let Some(tx) = tx_hash.filter(|s| !s.trim().is_empty()) {
            return tx.trim().to_lowercase();
        }

        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(user_id.as_i64().to_le_bytes());
        hasher.update(time_ms.as_ms().to_le_bytes());
        hasher.update(amount.raw().to_le_bytes());

        let hash = hasher.finalize();
        format!("hash:{}", hex::encode(&hash[..16]))
    }
}

fn normalize_tx_hash(tx_hash: Option<String>) -> Option<String> {
    tx_hash
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
}
