use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use matching_engine::config::Config;
use matching_engine::engine::MatchingEngine;
use matching_engine::facade::Exchange;
use matching_engine::market_data::MarketDataPublisher;
use matching_engine::api;
use matching_engine::utils::shutdown_token;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::parse();
    let symbols = config.symbol_universe()?;

    let engine = Arc::new(MatchingEngine::new(symbols));
    let market_data = Arc::new(MarketDataPublisher::new(
        Arc::clone(&engine),
        config.max_depth,
        Duration::from_millis(config.publish_interval_ms),
    ));

    let shutdown = shutdown_token();
    Arc::clone(&market_data).spawn_ticker(shutdown.clone());

    let exchange = Exchange::new(engine, market_data);
    let app = api::router(exchange, config.max_depth);

    let addr = format!("0.0.0.0:{}", config.fix_port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(
        %addr,
        market_data_port = config.market_data_port,
        "order-entry and market-data WebSocket server listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    Ok(())
}
