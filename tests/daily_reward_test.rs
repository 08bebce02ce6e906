use stakeledger::datasource::MockDepositSource;
use stakeledger::db::init_db;
use stakeledger::domain::{Address, Amount, DepositEvent, PositionStatus, RewardKind, TimeMs, UserId};
use stakeledger::orchestration::{EngineSettings, RewardEngine};
use stakeledger::Repository;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const NOW: TimeMs = TimeMs(1_700_000_000_000);

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
        ("out_rate", "300"),
        ("recommend_need", "0"),
        ("reward_rate", "100"),
        ("coin_reward_rate", "0"),
        ("coin_price", "1000"),
        ("location_reward_rate", "10"),
        ("recommend_one_rate", "20"),
        ("recommend_two_rate", "10"),
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

fn deposit(user: UserId, units: i64, hash: &str) -> DepositEvent {
    DepositEvent::new(
        user,
        Amount::from_units(units),
        units.to_string(),
        "USDT".to_string(),
        TimeMs::new(1_000),
        Some(hash.to_string()),
    )
}

/// root <- mid <- leaf, each with a 100 deposit (capacity 300, principal 100).
async fn three_generations(engine: &RewardEngine) -> (UserId, UserId, UserId) {
    let root = engine
        .register_user(&Address::new("0xroot".to_string()), None, TimeMs::new(1))
        .await
        .unwrap();
    let mid = engine
        .register_user(&Address::new("0xmid".to_string()), Some(root), TimeMs::new(2))
        .await
        .unwrap();
    let leaf = engine
        .register_user(&Address::new("0xleaf".to_string()), Some(mid), TimeMs::new(3))
        .await
        .unwrap();

    let source = MockDepositSource::new().with_deposits(vec![
        deposit(root, 100, "0x1"),
        deposit(mid, 100, "0x2"),
        deposit(leaf, 100, "0x3"),
    ]);
    let report = engine.scan_deposits(&source, NOW).await.unwrap().unwrap();
    assert_eq!(report.applied(), 3);
    (root, mid, leaf)
}

async fn current_of(repo: &Repository, user: UserId) -> Amount {
    repo.positions_for_user(user).await.unwrap()[0].current
}

#[tokio::test]
async fn test_daily_reward_cascades_to_qualified_ancestors() {
    let (engine, repo, _temp) = setup().await;
    let (root, mid, leaf) = three_generations(&engine).await;
    // second generation needs two direct referrals
    engine.set_vip(root, 1).await.unwrap();

    let report = engine.run_daily_position_reward(NOW).await.unwrap();
    assert_eq!(report.applied(), 3, "{:?}", report.items);

    // base reward is 10 for every position
    assert_eq!(current_of(&repo, leaf).await, Amount::from_units(10));
    assert_eq!(current_of(&repo, mid).await, Amount::from_units(12));
    assert_eq!(current_of(&repo, root).await, Amount::from_units(13));

    let root_rewards = repo.rewards_for_user(root).await.unwrap();
    let team: Vec<_> = root_rewards
        .iter()
        .filter(|r| r.kind == RewardKind::RecommendTeam)
        .collect();
    assert_eq!(team.len(), 2);
    assert_eq!(team[0].amount, Amount::from_units(2));
    assert_eq!(team[1].amount, Amount::from_units(1));
    assert!(team.iter().all(|r| r.vip == Some(1) && r.history_recommend == Some(2)));
}

#[tokio::test]
async fn test_unqualified_generation_is_skipped() {
    let (engine, repo, _temp) = setup().await;
    let (root, mid, leaf) = three_generations(&engine).await;

    engine.run_daily_position_reward(NOW).await.unwrap();

    // root has one direct referral, enough for generation 0 only
    assert_eq!(current_of(&repo, root).await, Amount::from_units(12));
    assert_eq!(current_of(&repo, mid).await, Amount::from_units(12));
    assert_eq!(current_of(&repo, leaf).await, Amount::from_units(10));
}

#[tokio::test]
async fn test_stopped_positions_are_not_rewarded() {
    let (engine, repo, _temp) = setup().await;
    repo.set_config("location_reward_rate", "300").await.unwrap();
    let (root, _mid, _leaf) = three_generations(&engine).await;

    // the first run fills every capacity
    let first = engine.run_daily_position_reward(NOW).await.unwrap();
    assert_eq!(first.applied(), 3);
    let second = engine.run_daily_position_reward(NOW).await.unwrap();
    assert!(second.items.is_empty());

    let root_position = &repo.positions_for_user(root).await.unwrap()[0];
    assert!(!root_position.is_running());
    assert_eq!(root_position.stop_date, Some(NOW));
}

#[tokio::test]
async fn test_position_stopped_earlier_in_batch_still_credited() {
    let (engine, repo, _temp) = setup().await;
    repo.set_config("recommend_one_rate", "300").await.unwrap();
    repo.set_config("location_reward_rate", "100").await.unwrap();

    let root = engine
        .register_user(&Address::new("0xroot".to_string()), None, TimeMs::new(1))
        .await
        .unwrap();
    let mid = engine
        .register_user(&Address::new("0xmid".to_string()), Some(root), TimeMs::new(2))
        .await
        .unwrap();
    let leaf = engine
        .register_user(&Address::new("0xleaf".to_string()), Some(mid), TimeMs::new(3))
        .await
        .unwrap();

    // leaf's position gets the lowest id, so it is rewarded first
    let source = MockDepositSource::new().with_deposits(vec![
        deposit(leaf, 100, "0x1"),
        deposit(mid, 100, "0x2"),
        deposit(root, 100, "0x3"),
    ]);
    engine.scan_deposits(&source, NOW).await.unwrap().unwrap();

    let report = engine.run_daily_position_reward(NOW).await.unwrap();
    assert_eq!(report.applied(), 3, "{:?}", report.items);

    // leaf's cascade fills mid (300); mid still takes its own 100 and
    // passes 300 on to root, which then also takes its own 100
    let mid_position = &repo.positions_for_user(mid).await.unwrap()[0];
    assert_eq!(mid_position.current, Amount::from_units(400));
    assert!(!mid_position.is_running());
    assert_eq!(mid_position.stop_date, Some(NOW));
    assert_eq!(current_of(&repo, leaf).await, Amount::from_units(100));
    assert_eq!(current_of(&repo, root).await, Amount::from_units(400));

    let mid_daily: Vec<_> = repo
        .rewards_for_user(mid)
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.kind == RewardKind::DailyPosition)
        .collect();
    assert_eq!(mid_daily.len(), 1);
    assert_eq!(
        mid_daily[0].position_status,
        Some(PositionStatus::Stopped)
    );
}
