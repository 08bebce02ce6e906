//! Operator overrides and user registration.

use super::{EngineError, RewardEngine};
use crate::domain::rates::AREA_TIERS;
use crate::domain::{Address, ReferralChain, ReferralProfile, TimeMs, UserId};
use tracing::info;

impl RewardEngine {
    /// Register a user under `referrer` (or as a root).
    pub async fn register_user(
        &self,
        address: &Address,
        referrer: Option<UserId>,
        now: TimeMs,
    ) -> Result<UserId, EngineError> {
        if let Some(parent) = referrer {
            let raw = self
                .repo
                .chain_text(parent)
                .await?
                .ok_or(EngineError::UserNotFound(parent))?;
            ReferralChain::parse(&raw).map_err(|e| EngineError::MalformedChain {
                user: parent,
                reason: e.to_string(),
            })?;
        }

        let user = self.repo.register_user(address, referrer, now).await?;
        info!(user_id = %user, address = %address, "User registered");
        Ok(user)
    }

    /// Force the manual area tier of a user; 0 clears the override.
    pub async fn set_area_level(&self, user: UserId, level: i64) -> Result<(), EngineError> {
        if !(0..=AREA_TIERS as i64).contains(&level) {
            return Err(EngineError::InvalidValue {
                field: "area level",
                value: level,
            });
        }

        let mut uow = self.repo.begin().await?;
        if !uow.user_exists(user).await? {
            return Err(EngineError::UserNotFound(user));
        }
        uow.set_area_level(user, level).await?;
        uow.commit().await?;

        info!(user_id = %user, level, "Area level set");
        Ok(())
    }

    /// Force a VIP tier, aligning the referral counter with its threshold.
    pub async fn set_vip(&self, user: UserId, vip: i64) -> Result<ReferralProfile, EngineError> {
        let mut uow = self.repo.begin().await?;
        if !uow.user_exists(user).await? {
            return Err(EngineError::UserNotFound(user));
        }
        let mut profile = uow
            .referral_profile(user)
            .await?
            .unwrap_or_else(|| ReferralProfile::new(user));
        if !profile.force_vip(vip) {
            return Err(EngineError::InvalidValue {
                field: "vip",
                value: vip,
            });
        }
        uow.save_referral_profile(&profile).await?;
        uow.commit().await?;

        info!(user_id = %user, vip, history_recommend = profile.history_recommend, "VIP set");
        Ok(profile)
    }
}
