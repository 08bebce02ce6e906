//! Immutable snapshot of the business rate parameters.
//!
//! Resolved once per engine operation from the `configs` table. A key that is
//! missing or does not parse as an integer reads as `0` for that operation.

use crate::domain::{Amount, AreaAmount};
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

/// Number of area tiers.
pub const AREA_TIERS: usize = 4;

/// Config keys for generations 0-9; slots 10-19 share `recommend_eleven_twenty_rate`.
const GENERATION_RATE_KEYS: [&str; 10] = [
    "recommend_one_rate",
    "recommend_two_rate",
    "recommend_three_rate",
    "recommend_four_rate",
    "recommend_five_rate",
    "recommend_six_rate",
    "recommend_seven_rate",
    "recommend_eight_rate",
    "recommend_nine_rate",
    "recommend_ten_rate",
];

const AREA_THRESHOLD_KEYS: [&str; AREA_TIERS] = [
    "recommend_area_one",
    "recommend_area_two",
    "recommend_area_three",
    "recommend_area_four",
];

const AREA_RATE_KEYS: [&str; AREA_TIERS] = [
    "recommend_area_one_rate",
    "recommend_area_two_rate",
    "recommend_area_three_rate",
    "recommend_area_four_rate",
];

/// Every key the engine reads.
pub const CONFIG_KEYS: [&str; 26] = [
    "recommend_need",
    "time_again",
    "out_rate",
    "coin_price",
    "reward_rate",
    "coin_reward_rate",
    "location_reward_rate",
    "recommend_one_rate",
    "recommend_two_rate",
    "recommend_three_rate",
    "recommend_four_rate",
    "recommend_five_rate",
    "recommend_six_rate",
    "recommend_seven_rate",
    "recommend_eight_rate",
    "recommend_nine_rate",
    "recommend_ten_rate",
    "recommend_eleven_twenty_rate",
    "recommend_area_one",
    "recommend_area_two",
    "recommend_area_three",
    "recommend_area_four",
    "recommend_area_one_rate",
    "recommend_area_two_rate",
    "recommend_area_three_rate",
    "recommend_area_four_rate",
];

/// A reward converted into its usdt-equivalent and coin-equivalent parts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RewardSplit {
    pub usdt: Amount,
    pub coin: Amount,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RateSnapshot {
    /// Generation-0 bonus percentage paid on deposits.
    pub recommend_need: i64,
    /// Freeze window in minutes.
    pub time_again: i64,
    /// Capacity multiplier as a percentage.
    pub out_rate: i64,
    /// Coin price, per-mille scaled.
    pub coin_price: i64,
    /// Percentage of a reward paid out as usdt.
    pub reward_rate: i64,
    /// Percentage of a reward paid out as coin.
    pub coin_reward_rate: i64,
    /// Daily maturity reward percentage of a running position's principal.
    pub location_reward_rate: i64,
    /// Commission percentage per generation.
    pub generation_rates: [i64; 20],
    /// Area tier thresholds in display units.
    pub area_thresholds: [i64; AREA_TIERS],
    /// Share of the fee pool per area tier, percent.
    pub area_rates: [i64; AREA_TIERS],
}

impl RateSnapshot {
    /// Resolve a snapshot from raw key/value pairs.
    pub fn from_map(values: &HashMap<String, String>) -> Self {
        let get = |key: &str| -> i64 {
            match values.get(key) {
                None => 0,
                Some(raw) => raw.trim().parse::<i64>().unwrap_or_else(|e| {
                    warn!(key = %key, value = %raw, error = %e, "Unparsable config value, using 0");
                    0
                }),
            }
        };

        let mut generation_rates = [0i64; 20];
        for (slot, key) in GENERATION_RATE_KEYS.iter().enumerate() {
            generation_rates[slot] = get(key);
        }
        let eleven_twenty = get("recommend_eleven_twenty_rate");
        for rate in generation_rates.iter_mut().skip(GENERATION_RATE_KEYS.len()) {
            *rate = eleven_twenty;
        }

        let mut area_thresholds = [0i64; AREA_TIERS];
        let mut area_rates = [0i64; AREA_TIERS];
        for tier in 0..AREA_TIERS {
            area_thresholds[tier] = get(AREA_THRESHOLD_KEYS[tier]);
            area_rates[tier] = get(AREA_RATE_KEYS[tier]);
        }

        RateSnapshot {
            recommend_need: get("recommend_need"),
            time_again: get("time_again"),
            out_rate: get("out_rate"),
            coin_price: get("coin_price"),
            reward_rate: get("reward_rate"),
            coin_reward_rate: get("coin_reward_rate"),
            location_reward_rate: get("location_reward_rate"),
            generation_rates,
            area_thresholds,
            area_rates,
        }
    }

    /// Convert a raw reward into usdt (`* reward_rate / 100`) and coin
    /// (`* coin_reward_rate / 100 * coin_price / 1000`).
    pub fn split(&self, reward: Amount) -> RewardSplit {
        RewardSplit {
            usdt: reward.percent(self.reward_rate),
            coin: reward
                .percent(self.coin_reward_rate)
                .mul_div(self.coin_price, 1000),
        }
    }

    /// Capacity of a deposit placement: `amount * out_rate / 100`.
    pub fn capacity_for(&self, amount: Amount) -> Amount {
        amount.percent(self.out_rate)
    }

    /// Rate table holding only the deposit-time generation-0 bonus.
    pub fn deposit_generation_rates(&self) -> [i64; 20] {
        let mut rates = [0i64; 20];
        rates[0] = self.recommend_need;
        rates
    }

    pub fn area_threshold(&self, tier: usize) -> AreaAmount {
        AreaAmount::from_units(self.area_thresholds[tier])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_missing_keys_read_as_zero() {
        let snapshot = RateSnapshot::from_map(&HashMap::new());
        assert_eq!(snapshot, RateSnapshot::default());
    }

    #[test]
    fn test_unparsable_value_reads_as_zero() {
        let snapshot = RateSnapshot::from_map(&map(&[("out_rate", "three"), ("reward_rate", "80")]));
        assert_eq!(snapshot.out_rate, 0);
        assert_eq!(snapshot.reward_rate, 80);
    }

    #[test]
    fn test_eleven_twenty_rate_fills_upper_slots() {
        let snapshot = RateSnapshot::from_map(&map(&[
            ("recommend_one_rate", "10"),
            ("recommend_ten_rate", "3"),
            ("recommend_eleven_twenty_rate", "1"),
        ]));
        assert_eq!(snapshot.generation_rates[0], 10);
        assert_eq!(snapshot.generation_rates[9], 3);
        assert!(snapshot.generation_rates[10..].iter().all(|r| *r == 1));
    }

    #[test]
    fn test_split_applies_rates_in_order() {
        let snapshot = RateSnapshot::from_map(&map(&[
            ("reward_rate", "70"),
            ("coin_reward_rate", "30"),
            ("coin_price", "2000"),
        ]));
        let split = snapshot.split(Amount::from_units(10));
        assert_eq!(split.usdt, Amount::from_units(7));
        assert_eq!(split.coin, Amount::from_units(6));
    }

    #[test]
    fn test_capacity_for_deposit() {
        let snapshot = RateSnapshot::from_map(&map(&[("out_rate", "300")]));
        assert_eq!(snapshot.capacity_for(Amount::from_units(50)), Amount::from_units(150));
    }

    #[test]
    fn test_every_key_listed_once() {
        let mut keys = CONFIG_KEYS.to_vec();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), CONFIG_KEYS.len());
        assert!(!CONFIG_KEYS.contains(&"withdraw_rate"));
    }

    #[test]
    fn test_area_keys() {
        let snapshot = RateSnapshot::from_map(&map(&[
            ("recommend_area_two", "1000"),
            ("recommend_area_four_rate", "5"),
        ]));
        assert_eq!(snapshot.area_threshold(1), AreaAmount::from_units(1000));
        assert_eq!(snapshot.area_rates[3], 5);
    }
}
