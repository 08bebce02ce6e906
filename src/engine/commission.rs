//! Multi-generation referral commission calculator.
//!
//! Pure computation: the caller resolves the ancestor chain and each
//! ancestor's referral profile, this module decides who earns what.

use crate::domain::{Amount, ReferralProfile, UserId, MAX_GENERATIONS};

/// Minimum lifetime direct referrals needed for generations 0-9.
const MIN_HISTORY: [i64; 10] = [1, 2, 3, 4, 4, 4, 5, 5, 5, 5];

/// Minimum lifetime direct referrals for generations 10-19.
const MIN_HISTORY_DEEP: i64 = 6;

/// Referral count an ancestor needs to earn at `generation`.
pub fn min_history_for(generation: usize) -> i64 {
    MIN_HISTORY
        .get(generation)
        .copied()
        .unwrap_or(MIN_HISTORY_DEEP)
}

/// One ancestor considered for a commission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub generation: usize,
    pub profile: ReferralProfile,
}

/// A commission owed to one ancestor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommissionShare {
    pub generation: usize,
    pub user_id: UserId,
    /// Raw commission before the usdt/coin split.
    pub amount: Amount,
    /// Profile at the time of payment, recorded on the reward row.
    pub profile: ReferralProfile,
}

/// Commissions for `reward` over `candidates`, in generation order.
///
/// Each generation's commission is `reward * rates[g] / 100`, computed from the
/// same `reward`. Ancestors below the generation's referral minimum, beyond
/// [`MAX_GENERATIONS`], or with a zero commission are left out.
pub fn compute_commissions(
    reward: Amount,
    rates: &[i64; MAX_GENERATIONS],
    candidates: &[Candidate],
) -> Vec<CommissionShare> {
    if !reward.is_positive() {
        return Vec::new();
    }

    candidates
        .iter()
        .filter(|c| c.generation < MAX_GENERATIONS)
        .filter(|c| c.profile.history_recommend >= min_history_for(c.generation))
        .filter_map(|c| {
            let amount = reward.percent(rates[c.generation]);
            amount.is_positive().then_some(CommissionShare {
                generation: c.generation,
                user_id: c.profile.user_id,
                amount,
                profile: c.profile,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(generation: usize, user: i64, history: i64) -> Candidate {
        Candidate {
            generation,
            profile: ReferralProfile {
                user_id: UserId::new(user),
                vip: 0,
                history_recommend: history,
            },
        }
    }

    fn flat_rates(rate: i64) -> [i64; MAX_GENERATIONS] {
        [rate; MAX_GENERATIONS]
    }

    #[test]
    fn test_min_history_table() {
        let mins: Vec<i64> = (0..MAX_GENERATIONS).map(min_history_for).collect();
        assert_eq!(&mins[..10], &[1, 2, 3, 4, 4, 4, 5, 5, 5, 5]);
        assert!(mins[10..].iter().all(|m| *m == 6));
    }

    #[test]
    fn test_unqualified_ancestor_skipped() {
        let reward = Amount::from_units(100);
        let shares = compute_commissions(
            reward,
            &flat_rates(10),
            &[candidate(0, 1, 1), candidate(1, 2, 1), candidate(2, 3, 3)],
        );
        let users: Vec<i64> = shares.iter().map(|s| s.user_id.as_i64()).collect();
        assert_eq!(users, vec![1, 3]);
        assert!(shares.iter().all(|s| s.amount == Amount::from_units(10)));
    }

    #[test]
    fn test_each_generation_uses_its_rate() {
        let mut rates = [0i64; MAX_GENERATIONS];
        rates[0] = 10;
        rates[1] = 5;
        rates[12] = 1;
        let shares = compute_commissions(
            Amount::from_units(200),
            &rates,
            &[candidate(0, 1, 9), candidate(1, 2, 9), candidate(5, 3, 9), candidate(12, 4, 9)],
        );
        let got: Vec<(usize, Amount)> = shares.iter().map(|s| (s.generation, s.amount)).collect();
        assert_eq!(
            got,
            vec![
                (0, Amount::from_units(20)),
                (1, Amount::from_units(10)),
                (12, Amount::from_units(2)),
            ]
        );
    }

    #[test]
    fn test_total_never_exceeds_reward() {
        // Rates summing to exactly 100 across all generations.
        let mut rates = [0i64; MAX_GENERATIONS];
        for (g, r) in rates.iter_mut().enumerate() {
            *r = if g < 10 { 8 } else { 2 };
        }
        let candidates: Vec<Candidate> = (0..MAX_GENERATIONS)
            .map(|g| candidate(g, g as i64 + 1, 10))
            .collect();
        for raw in [1i64, 7, 999, 123_456_789, 10_000_000_000_000] {
            let reward = Amount::from_scaled(raw);
            let shares = compute_commissions(reward, &rates, &candidates);
            let total: Amount = shares.iter().map(|s| s.amount).sum();
            assert!(total <= reward, "total {} exceeds reward {}", total, reward);
        }
    }

    #[test]
    fn test_non_positive_reward_pays_nothing() {
        let shares = compute_commissions(Amount::ZERO, &flat_rates(10), &[candidate(0, 1, 5)]);
        assert!(shares.is_empty());
    }

    #[test]
    fn test_generation_beyond_table_ignored() {
        let shares = compute_commissions(
            Amount::from_units(10),
            &flat_rates(10),
            &[candidate(MAX_GENERATIONS, 1, 50)],
        );
        assert!(shares.is_empty());
    }
}
