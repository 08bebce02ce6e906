use stakeledger::datasource::HttpDepositSource;
use stakeledger::orchestration::{spawn_deposit_scanner, EngineSettings};
use stakeledger::{api, config::Config, db::init_db, DepositSource, Repository, RewardEngine};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match init_db(&config.database_path).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let repo = Arc::new(Repository::new(pool));
    let engine = Arc::new(RewardEngine::new(repo, EngineSettings::from(&config)));

    let deposit_source: Option<Arc<dyn DepositSource>> = config
        .deposit_source_url
        .clone()
        .map(|url| Arc::new(HttpDepositSource::new(url)) as Arc<dyn DepositSource>);

    match &deposit_source {
        Some(source) => {
            spawn_deposit_scanner(engine.clone(), source.clone(), config.scan_interval());
        }
        None => tracing::info!("DEPOSIT_SOURCE_URL not set, deposit scanner disabled"),
    }

    let app = api::create_router(api::AppState::new(engine, deposit_source));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
