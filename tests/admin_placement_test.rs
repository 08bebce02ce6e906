use stakeledger::db::init_db;
use stakeledger::domain::{
    Address, Amount, AreaAmount, Position, PositionStatus, RewardKind, TimeMs, UserId,
};
use stakeledger::orchestration::{EngineError, EngineSettings, RewardEngine};
use stakeledger::Repository;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const NOW: TimeMs = TimeMs(1_700_000_000_000);
const MINUTE: i64 = 60_000;

async fn setup() -> (RewardEngine, Arc<Repository>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));

    for (key, value) in [
        ("recommend_need", "10"),
        ("reward_rate", "100"),
        ("coin_reward_rate", "0"),
        ("coin_price", "1000"),
        ("time_again", "60"),
    ] {
        repo.set_config(key, value).await.unwrap();
    }

    let settings = EngineSettings {
        lock_attempts: 1,
        lock_retry_delay: Duration::ZERO,
        business_utc_offset_hours: 8,
    };
    (RewardEngine::new(repo.clone(), settings), repo, temp_dir)
}

async fn user(repo: &Repository, addr: &str, referrer: Option<UserId>) -> UserId {
    repo.register_user(&Address::new(addr.to_string()), referrer, TimeMs::new(1))
        .await
        .unwrap()
}

/// Stopped position of capacity 150 that reached 160 at `stopped_at`.
async fn insert_overflowed(repo: &Repository, owner: UserId, stopped_at: TimeMs) -> Position {
    let mut p = Position::open(
        owner,
        Amount::ZERO,
        Amount::from_units(150),
        300,
        0,
        TimeMs::new(1),
    );
    p.credit(Amount::from_units(160), Amount::from_units(2), stopped_at);
    assert_eq!(p.status, PositionStatus::Stopped);

    let mut uow = repo.begin().await.unwrap();
    p.id = uow.insert_position(&p).await.unwrap();
    uow.commit().await.unwrap();
    p
}

#[tokio::test]
async fn test_unknown_amount_rejected_without_writes() {
    let (engine, repo, _temp) = setup().await;
    let u = user(&repo, "0xu", None).await;

    let err = engine.admin_place(u, 75, NOW).await.unwrap_err();
    assert!(matches!(err, EngineError::UnrecognizedAmount(75)));
    assert!(repo.positions_for_user(u).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_tier_placement_and_referrer_bonus() {
    let (engine, repo, _temp) = setup().await;
    let referrer = user(&repo, "0xr", None).await;
    let child = user(&repo, "0xc", Some(referrer)).await;

    engine.admin_place(referrer, 50, NOW).await.unwrap();
    let summary = engine.admin_place(child, 100, NOW).await.unwrap();

    assert_eq!(summary.position.level, 2);
    assert_eq!(summary.position.current_max, Amount::from_units(1500));
    assert_eq!(summary.position.out_rate, 500);
    assert_eq!(summary.position.status, PositionStatus::Running);
    assert_eq!(summary.commissions_paid, 1);

    // 10% of the referrer's own 100 principal
    let referrer_position = &repo.positions_for_user(referrer).await.unwrap()[0];
    assert_eq!(referrer_position.current, Amount::from_units(10));

    let child_area = repo.user_area(child).await.unwrap().unwrap();
    assert_eq!(child_area.self_amount, AreaAmount::from_units(300));
    let referrer_area = repo.user_area(referrer).await.unwrap().unwrap();
    assert_eq!(referrer_area.amount, AreaAmount::from_units(300));
    assert_eq!(referrer_area.self_amount, AreaAmount::from_units(100));

    // admin placements never credit the wallet with a deposit
    let child_rewards = repo.rewards_for_user(child).await.unwrap();
    assert!(child_rewards.iter().all(|r| r.kind != RewardKind::Deposit));
    assert_eq!(repo.deposit_record_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_running_position_blocks_placement() {
    let (engine, repo, _temp) = setup().await;
    let u = user(&repo, "0xu", None).await;

    engine.admin_place(u, 300, NOW).await.unwrap();
    let err = engine.admin_place(u, 50, NOW).await.unwrap_err();
    assert!(matches!(err, EngineError::PositionRunning(id) if id == u));
    assert_eq!(repo.positions_for_user(u).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_overflow_within_window_is_carried_over() {
    let (engine, repo, _temp) = setup().await;
    let u = user(&repo, "0xu", None).await;
    let old = insert_overflowed(&repo, u, TimeMs::new(NOW.as_ms() - 10 * MINUTE)).await;

    let summary = engine.admin_place(u, 50, NOW).await.unwrap();
    assert_eq!(summary.position.current, Amount::from_units(10));
    assert_eq!(summary.carry_over_paid, Amount::from_units(10));
    assert_eq!(summary.carry_over_sources, 1);

    let old = repo.get_position(old.id).await.unwrap().unwrap();
    assert!(old.carried_over);

    let balance = repo.balance_of(u).await.unwrap();
    assert_eq!(balance.usdt, Amount::from_units(10));
    assert_eq!(balance.coin, Amount::from_units(2));
    let rewards = repo.rewards_for_user(u).await.unwrap();
    assert_eq!(rewards.last().map(|r| r.kind), Some(RewardKind::CarryOver));
}

#[tokio::test]
async fn test_overflow_outside_window_is_forfeited() {
    let (engine, repo, _temp) = setup().await;
    let u = user(&repo, "0xu", None).await;
    let old = insert_overflowed(&repo, u, TimeMs::new(NOW.as_ms() - 120 * MINUTE)).await;

    let summary = engine.admin_place(u, 50, NOW).await.unwrap();
    assert_eq!(summary.position.current, Amount::ZERO);
    assert_eq!(summary.carry_over_sources, 0);
    assert!(!repo.get_position(old.id).await.unwrap().unwrap().carried_over);
    assert_eq!(repo.balance_of(u).await.unwrap().usdt, Amount::ZERO);
}

#[tokio::test]
async fn test_first_referral_counted_once() {
    let (engine, repo, _temp) = setup().await;
    let referrer = user(&repo, "0xr", None).await;
    let child = user(&repo, "0xc", Some(referrer)).await;

    engine.admin_place(child, 50, NOW).await.unwrap();

    // fill the child's position so it can be placed again
    let mut position = repo.positions_for_user(child).await.unwrap().remove(0);
    position.credit(Amount::from_units(500), Amount::ZERO, NOW);
    let mut uow = repo.begin().await.unwrap();
    uow.update_position_progress(&position).await.unwrap();
    uow.commit().await.unwrap();

    engine.admin_place(child, 50, NOW).await.unwrap();

    let profile = repo.referral_profile(referrer).await.unwrap().unwrap();
    assert_eq!(profile.history_recommend, 1);
    assert_eq!(repo.monthly_recommend_count(referrer).await.unwrap(), 1);
    assert_eq!(repo.positions_for_user(child).await.unwrap().len(), 2);
}
