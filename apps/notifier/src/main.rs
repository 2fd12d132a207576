use anyhow::{Context, Result};
use notifier::{
    Clients,
    config::Config,
    pipeline::{Outcome, run_alert},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("loading configuration")?;
    info!(
        symbol = %config.alert.symbol,
        company = %config.alert.company_name,
        threshold = config.alert.percent_threshold,
        top_n = config.alert.top_n,
        "starting stock alert run"
    );

    let clients = Clients::from_config(&config).context("building provider clients")?;
    let today = chrono::Local::now().date_naive();

    match run_alert(
        &config.alert,
        today,
        &clients.price_client,
        &clients.news_client,
        &clients.messenger,
    )
    .await?
    {
        Outcome::BelowThreshold { change } => {
            info!(change, "run complete, below threshold");
        }
        Outcome::Alerted {
            change,
            message_ids,
        } => {
            info!(change, sent = message_ids.len(), "run complete, alerts sent");
        }
    }

    Ok(())
}
