//! Pure computation for the reward engine.
//!
//! Nothing here touches storage: the orchestration layer loads the inputs,
//! calls into these functions, and persists the results inside one unit of work.

pub mod area;
pub mod carry_over;
pub mod commission;
pub mod placement;

pub use area::{net_area_amount, tier_share, tiers_reached, TierMembership};
pub use carry_over::{compute_carry_over, within_freeze_window, CarryOver};
pub use commission::{compute_commissions, min_history_for, Candidate, CommissionShare};
pub use placement::{admin_tier_for, AdminTier};
