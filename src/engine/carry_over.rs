//! Freeze window and carry-over of unused principal.

use crate::domain::{Amount, Position, PositionId, TimeMs};

/// Overflow a new placement absorbs from the owner's stopped positions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarryOver {
    /// Summed overflow; seeds the new position's `current`.
    pub seed: Amount,
    /// Summed coin accrual of the absorbed positions.
    pub coin: Amount,
    /// Positions whose overflow was absorbed.
    pub sources: Vec<PositionId>,
}

impl CarryOver {
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Amount paid out as a carry-over deposit, clamped to the new capacity.
    pub fn payout(&self, cap: Amount) -> Amount {
        self.seed.min(cap)
    }
}

/// Whether `position` stopped recently enough to hand over its overflow.
pub fn within_freeze_window(position: &Position, now: TimeMs, time_again_minutes: i64) -> bool {
    match position.stop_date {
        Some(stop) => now < stop.plus_minutes(time_again_minutes),
        None => false,
    }
}

/// Sum the eligible overflow of `stopped`.
///
/// A position contributes when it is Stopped, was never carried over, has a
/// positive overflow and stopped within the freeze window.
pub fn compute_carry_over(stopped: &[Position], now: TimeMs, time_again_minutes: i64) -> CarryOver {
    let mut carry = CarryOver::default();
    for position in stopped {
        if position.is_running() || position.carried_over {
            continue;
        }
        let overflow = position.overflow();
        if !overflow.is_positive() || !within_freeze_window(position, now, time_again_minutes) {
            continue;
        }
        carry.seed += overflow;
        carry.coin += position.stop_coin;
        carry.sources.push(position.id);
    }
    carry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PositionStatus, UserId};

    const MINUTE: i64 = 60_000;

    fn stopped(id: i64, overflow: i64, stop_at: i64) -> Position {
        let mut p = Position::open(
            UserId::new(1),
            Amount::ZERO,
            Amount::from_scaled(1_000),
            300,
            0,
            TimeMs::new(0),
        );
        p.id = PositionId::new(id);
        p.current = Amount::from_scaled(1_000 + overflow);
        p.status = PositionStatus::Stopped;
        p.stop_date = Some(TimeMs::new(stop_at));
        p
    }

    #[test]
    fn test_half_window_absorbs_overflow() {
        let t = 1_000 * MINUTE;
        let time_again = 60;
        let carry = compute_carry_over(&[stopped(1, 500, t)], TimeMs::new(t + 30 * MINUTE), time_again);
        assert_eq!(carry.seed, Amount::from_scaled(500));
        assert_eq!(carry.sources, vec![PositionId::new(1)]);
    }

    #[test]
    fn test_expired_window_absorbs_nothing() {
        let t = 1_000 * MINUTE;
        let carry = compute_carry_over(&[stopped(1, 500, t)], TimeMs::new(t + 120 * MINUTE), 60);
        assert_eq!(carry.seed, Amount::ZERO);
        assert!(carry.is_empty());
    }

    #[test]
    fn test_multiple_positions_are_summed() {
        let t = 1_000 * MINUTE;
        let mut used = stopped(3, 700, t);
        used.carried_over = true;
        let positions = vec![stopped(1, 500, t), stopped(2, 250, t), used, stopped(4, 0, t)];
        let carry = compute_carry_over(&positions, TimeMs::new(t + MINUTE), 60);
        assert_eq!(carry.seed, Amount::from_scaled(750));
        assert_eq!(carry.sources, vec![PositionId::new(1), PositionId::new(2)]);
    }

    #[test]
    fn test_payout_clamped_to_capacity() {
        let carry = CarryOver {
            seed: Amount::from_scaled(900),
            coin: Amount::ZERO,
            sources: vec![PositionId::new(1)],
        };
        assert_eq!(carry.payout(Amount::from_scaled(400)), Amount::from_scaled(400));
        assert_eq!(carry.payout(Amount::from_scaled(4_000)), Amount::from_scaled(900));
    }
}
