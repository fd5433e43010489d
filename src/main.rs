use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

use hackpub::catalog::CatalogClient;
use hackpub::store::HttpObjectStore;
use hackpub::{config, db, recovery};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| cfg.database.url.clone());

    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    let store = HttpObjectStore::from_config(&cfg);
    let catalog = CatalogClient::from_config(&cfg)?;

    // Run the recovery worker until interrupted.
    let poll_sleep = Duration::from_millis(cfg.app.poll_interval_ms);
    let max_backoff = cfg.app.max_backoff_seconds as i64;
    let worker = async {
        loop {
            match recovery::process_next_task(&pool, &store, &catalog, max_backoff).await {
                Ok(processed) => {
                    if !processed {
                        tokio::time::sleep(poll_sleep).await;
                    }
                }
                Err(err) => {
                    error!(?err, "recovery worker error");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    };

    info!(hostname = %cfg.app.hostname, "recovery worker ready");
    tokio::select! {
        _ = worker => {}
        res = tokio::signal::ctrl_c() => res?,
    }
    info!("shutting down");

    Ok(())
}
