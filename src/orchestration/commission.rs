//! Applying rewards and cascading commissions inside a unit of work.

use super::EngineError;
use crate::db::repo::{NewReward, UnitOfWork};
use crate::domain::{
    select_active, Amount, PositionId, RateSnapshot, ReferralChain, ReferralProfile, RewardKind,
    RewardSplit, TimeMs, UserId, MAX_GENERATIONS,
};
use crate::engine::{compute_commissions, Candidate};
use tracing::debug;

/// Load and decode a user's ancestor chain.
pub(crate) async fn load_chain(
    uow: &mut UnitOfWork,
    user: UserId,
) -> Result<ReferralChain, EngineError> {
    let raw = uow
        .chain_text(user)
        .await?
        .ok_or(EngineError::UserNotFound(user))?;
    ReferralChain::parse(&raw).map_err(|e| EngineError::MalformedChain {
        user,
        reason: e.to_string(),
    })
}

/// How a credited reward is tagged in the ledger.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RewardTag<'a> {
    pub kind: RewardKind,
    pub source_position_id: Option<PositionId>,
    pub profile: Option<&'a ReferralProfile>,
}

/// Credit `split` to the user's active position and wallet and record it.
///
/// Returns the credited position, or `None` when the split is zero or the
/// user holds no position.
pub(crate) async fn pay_to_active_position(
    uow: &mut UnitOfWork,
    user: UserId,
    split: RewardSplit,
    tag: RewardTag<'_>,
    now: TimeMs,
) -> Result<Option<PositionId>, EngineError> {
    if split.usdt.is_zero() && split.coin.is_zero() {
        return Ok(None);
    }

    let positions = uow.positions_for_user(user).await?;
    let Some(active) = select_active(&positions) else {
        debug!(user_id = %user, kind = %tag.kind, "No position, reward dropped");
        return Ok(None);
    };

    let mut position = active.clone();
    let outcome = position.credit(split.usdt, split.coin, now);
    uow.update_position_progress(&position).await?;
    uow.credit_balance(user, split.usdt, split.coin).await?;
    uow.record_reward(&NewReward {
        user_id: user,
        amount: split.usdt,
        coin_amount: split.coin,
        kind: tag.kind,
        source_position_id: tag.source_position_id,
        position_status: Some(outcome.previous_status),
        vip: tag.profile.map(|p| p.vip),
        history_recommend: tag.profile.map(|p| p.history_recommend),
        created_at: now,
    })
    .await?;

    debug!(
        user_id = %user,
        position_id = %position.id,
        kind = %tag.kind,
        usdt = %split.usdt,
        coin = %split.coin,
        stopped = outcome.stopped_now,
        "Reward credited"
    );
    Ok(Some(position.id))
}

/// Pay `reward` up `chain` using the per-generation `table`.
///
/// Returns the number of ancestors actually credited.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn cascade_commissions(
    uow: &mut UnitOfWork,
    chain: &ReferralChain,
    reward: Amount,
    table: &[i64; MAX_GENERATIONS],
    kind: RewardKind,
    source_position_id: Option<PositionId>,
    rates: &RateSnapshot,
    now: TimeMs,
) -> Result<usize, EngineError> {
    if !reward.is_positive() {
        return Ok(0);
    }

    let mut candidates = Vec::new();
    for (generation, ancestor) in chain.generations() {
        if table[generation] <= 0 {
            continue;
        }
        let profile = uow
            .referral_profile(ancestor)
            .await?
            .unwrap_or_else(|| ReferralProfile::new(ancestor));
        candidates.push(Candidate {
            generation,
            profile,
        });
    }

    let mut paid = 0;
    for share in compute_commissions(reward, table, &candidates) {
        let tag = RewardTag {
            kind,
            source_position_id,
            profile: Some(&share.profile),
        };
        if pay_to_active_position(uow, share.user_id, rates.split(share.amount), tag, now)
            .await?
            .is_some()
        {
            paid += 1;
        }
    }
    Ok(paid)
}
