//! Shared placement pipeline and the operator placement entry point.

use super::commission::{cascade_commissions, load_chain};
use super::{EngineError, RewardEngine};
use crate::db::repo::{NewReward, UnitOfWork};
use crate::domain::{
    select_active, Amount, Position, PositionId, RateSnapshot, ReferralChain, ReferralProfile,
    RewardKind, TimeMs, UserId,
};
use crate::engine::{admin_tier_for, compute_carry_over};
use serde::Serialize;
use tracing::info;

/// Parameters of one new position.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PlacementRequest {
    pub user: UserId,
    pub capacity: Amount,
    pub out_rate: i64,
    pub level: i64,
    /// Value added to the user's and its ancestors' area aggregates.
    pub area_value: Amount,
}

/// Result of a placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacementSummary {
    pub position: Position,
    /// Overflow absorbed from stopped positions and paid out.
    pub carry_over_paid: Amount,
    pub carry_over_sources: usize,
    pub commissions_paid: usize,
}

/// Open a position for `req.user` and apply every side effect of a placement.
///
/// Runs entirely inside `uow`; the caller commits.
pub(crate) async fn place(
    uow: &mut UnitOfWork,
    req: PlacementRequest,
    rates: &RateSnapshot,
    now: TimeMs,
) -> Result<PlacementSummary, EngineError> {
    let user = req.user;
    if !uow.user_exists(user).await? {
        return Err(EngineError::UserNotFound(user));
    }
    let chain = load_chain(uow, user).await?;

    let existing = uow.positions_for_user(user).await?;
    if existing.iter().any(Position::is_running) {
        return Err(EngineError::PositionRunning(user));
    }

    let carry = compute_carry_over(&existing, now, rates.time_again);
    let mut position = Position::open(user, carry.seed, req.capacity, req.out_rate, req.level, now);
    position.id = uow.insert_position(&position).await?;
    if !carry.is_empty() {
        uow.mark_carried_over(&carry.sources).await?;
    }

    if existing.is_empty() {
        if let Some(referrer) = chain.direct_referrer() {
            let mut profile = uow
                .referral_profile(referrer)
                .await?
                .unwrap_or_else(|| ReferralProfile::new(referrer));
            profile.record_referral();
            uow.save_referral_profile(&profile).await?;
            uow.insert_monthly_recommend(referrer, user, now).await?;
        }
    }

    let commissions_paid = pay_referrer_bonus(uow, &chain, position.id, rates, now).await?;

    let area_delta = req.area_value.to_area();
    uow.add_self_area(user, area_delta).await?;
    uow.add_downline_area(chain.ancestors(), area_delta).await?;

    let mut carry_over_paid = Amount::ZERO;
    if !carry.is_empty() {
        carry_over_paid = carry.payout(req.capacity);
        let split = rates.split(carry_over_paid);
        let coin = split.coin + carry.coin;
        uow.credit_balance(user, split.usdt, coin).await?;
        uow.record_reward(&NewReward {
            user_id: user,
            amount: split.usdt,
            coin_amount: coin,
            kind: RewardKind::CarryOver,
            source_position_id: Some(position.id),
            position_status: None,
            vip: None,
            history_recommend: None,
            created_at: now,
        })
        .await?;
    }

    Ok(PlacementSummary {
        position,
        carry_over_paid,
        carry_over_sources: carry.sources.len(),
        commissions_paid,
    })
}

/// Generation-0 bonus for the direct referrer, based on the principal of the
/// referrer's own active position rather than on the new placement.
async fn pay_referrer_bonus(
    uow: &mut UnitOfWork,
    chain: &ReferralChain,
    source: PositionId,
    rates: &RateSnapshot,
    now: TimeMs,
) -> Result<usize, EngineError> {
    let Some(referrer) = chain.direct_referrer() else {
        return Ok(0);
    };
    let positions = uow.positions_for_user(referrer).await?;
    let Some(base) = select_active(&positions).map(Position::principal) else {
        return Ok(0);
    };

    cascade_commissions(
        uow,
        &ReferralChain::new(vec![referrer]),
        base,
        &rates.deposit_generation_rates(),
        RewardKind::RecommendFirst,
        Some(source),
        rates,
        now,
    )
    .await
}

impl RewardEngine {
    /// Operator placement for one of the fixed tier amounts.
    ///
    /// # Errors
    /// `UnrecognizedAmount` for an amount off the tier table, `PositionRunning`
    /// when the user already has a Running position, or any collaborator error.
    /// Nothing is written on error.
    pub async fn admin_place(
        &self,
        user: UserId,
        amount: i64,
        now: TimeMs,
    ) -> Result<PlacementSummary, EngineError> {
        let tier = admin_tier_for(amount).ok_or(EngineError::UnrecognizedAmount(amount))?;
        let rates = self.repo.load_rate_snapshot().await?;

        let mut uow = self.repo.begin().await?;
        let summary = place(
            &mut uow,
            PlacementRequest {
                user,
                capacity: tier.capacity,
                out_rate: tier.out_rate(),
                level: tier.level,
                area_value: tier.principal,
            },
            &rates,
            now,
        )
        .await?;
        uow.commit().await?;

        info!(
            user_id = %user,
            position_id = %summary.position.id,
            level = tier.level,
            "Admin placement applied"
        );
        Ok(summary)
    }
}
