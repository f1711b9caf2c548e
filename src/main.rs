use anyhow::Context;
use tracing_subscriber::EnvFilter;

use expense_tracker::{api, Config, ServiceContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env().context("Failed to load configuration")?;
    let ctx = ServiceContext::from_config(&config)?;

    api::serve(&config, ctx).await
}
