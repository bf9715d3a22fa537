use clap::Parser;

use equipment_analytics::infrastructure::config::AppConfig;
use equipment_analytics::infrastructure::logging::init_tracing;
use equipment_analytics::interfaces::cli::{AppContext, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    init_tracing(&config.log_filter);

    let context = AppContext::open(config).await?;
    let output = context.execute(cli.command).await?;
    println!("{}", output);

    Ok(())
}
