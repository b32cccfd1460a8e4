use std::sync::Arc;

use tracing::{info, warn};

use naver_relay::config::Config;
use naver_relay::store::StateStore;
use naver_relay::{api, schedule, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Configuration is sourced from the environment once, here, and injected
    // everywhere else.
    let config = Config::from_env();

    info!("Starting Naver search relay");
    info!("Upstream API: {}", config.naver.base_url);
    if config.naver.credentials().is_err() {
        warn!("Naver API credentials are not configured; searches will fail until they are set");
    }
    if config.remote.is_some() {
        info!("Remote datastore configured");
    }

    // Create HTTP client
    let http_client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    let store = StateStore::load(config.state_path.clone()).await;
    let state = Arc::new(AppState::new(config, http_client, store)?);

    // Schedule evaluator runs on its own timer, feeding the same gateway path
    // as manual searches.
    if state.config.scheduler.enabled {
        let evaluator_state = Arc::clone(&state);
        tokio::spawn(schedule::run(
            evaluator_state,
            Arc::new(schedule::SystemClock),
        ));
    }

    let app = api::router(Arc::clone(&state));

    let addr = format!("0.0.0.0:{}", state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Search relay listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
