use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use stockdesk::application::services::{AuthSession, QueryCache, RequestGateway, StockService};
use stockdesk::infrastructure::{
    AppConfig, CliArgs, ConfigStore, ProfileStore, RealtimeChannel, ReqwestTransport,
    WebSocketConnector,
};
use stockdesk::presentation::{AppContext, run};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry().with(filter).init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let store = ConfigStore::new()?;
    let mut config = store.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

fn create_context(config: &AppConfig) -> Result<AppContext> {
    let transport = Arc::new(ReqwestTransport::new(config.request_timeout())?);
    let token_store = config.token_store.build();

    let session = Arc::new(AuthSession::new(
        config.api_base_url.clone(),
        transport.clone(),
        token_store,
    ));
    let gateway = Arc::new(RequestGateway::new(
        config.api_base_url.clone(),
        transport,
        session.clone(),
        config.request_timeout(),
    ));
    let cache = Arc::new(QueryCache::new(
        config.cache.capacity,
        config.cache.max_retries,
    ));
    let stock = StockService::new(gateway.clone(), cache.clone(), config.cache.stale_time());
    let realtime = RealtimeChannel::new(
        config.realtime_config(),
        Arc::new(WebSocketConnector),
        session.clone(),
    );

    Ok(AppContext {
        session,
        gateway,
        cache,
        stock,
        realtime,
        profile: ProfileStore::new(),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    let args = CliArgs::parse();
    let config = load_config(&args)?;

    init_logging(&config)?;

    info!(
        version = stockdesk::VERSION,
        api = %config.api_base_url,
        token_store = %config.token_store,
        "Starting {}",
        stockdesk::NAME
    );

    let ctx = create_context(&config)?;
    run(args.command, &ctx).await
}
