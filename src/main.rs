mod alerts;
mod bootstrap;
mod config;
mod error;
mod ledger;
mod model;
mod pipeline;
mod retry;
mod sources;
mod store;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Initialize logging and tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,richlist=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("🚀 Starting XRP Ledger Rich List Pipeline");

    // Load configuration
    dotenv::dotenv().ok();
    let config = config::Config::from_env()?;

    let pipeline = bootstrap::initialize_pipeline(&config).await?;

    match config.run_interval {
        // One snapshot per invocation; schedulers call us on their cadence.
        None => {
            let report = pipeline.run().await?;
            info!(
                "🌐 Snapshot run {} finished: {} rows published",
                report.run_id, report.published_rows
            );
        }
        // Long-running mode: a failed cycle is logged and the next one
        // starts on schedule with the previous output still in place.
        Some(interval) => {
            info!("⏰ Running every {}s", interval.as_secs());
            loop {
                if let Err(err) = pipeline.run().await {
                    error!("❌ Snapshot run failed: {}", err);
                }
                tokio::time::sleep(interval).await;
            }
        }
    }

    Ok(())
}
