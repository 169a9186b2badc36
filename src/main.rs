use loopsim::config::DataSourceKind;
use loopsim::{
    api, init_db, Config, CsvDataSource, LlamaDataSource, MarketDataLoader, MarketDataSource,
    Orchestrator, ResponseCache,
};
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

    let pool = match init_db(&config.cache_db_path).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize cache database: {}", e);
            std::process::exit(1);
        }
    };
    let cache = ResponseCache::new(pool, config.cache_ttl);

    let source: Arc<dyn MarketDataSource> = match &config.data_source {
        DataSourceKind::Live => Arc::new(LlamaDataSource::new(config.endpoints.clone())),
        DataSourceKind::Csv { dir } => {
            tracing::info!("Reading market history from {}", dir);
            Arc::new(CsvDataSource::new(dir))
        }
    };
    let loader = MarketDataLoader::new(source, Some(cache));
    let orchestrator = Arc::new(Orchestrator::new(loader, config.policy()));

    let app = api::create_router(api::AppState::new(orchestrator));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        max_loops = config.max_loops,
        lookback_days = config.lookback_days,
        "Server listening on {}",
        addr
    );

    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
