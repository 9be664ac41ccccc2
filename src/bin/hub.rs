use std::sync::Arc;

use clap::Parser;
use logvault::{
    config::read_config_file,
    gateway::Gateway,
    registry::{MemoryRegistry, TenantRegistry},
};
use tracing::{debug, error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("logvault", LevelFilter::TRACE),
        ("hub", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = read_config_file(&args.file)?;

    let registry: Arc<dyn TenantRegistry> = Arc::new(MemoryRegistry::new());
    let gateway = Gateway::new(registry, &config);

    for seed in &config.tenants {
        match gateway
            .register_tenant(&seed.app_id, &seed.name, seed.health_urls.clone())
            .await
        {
            Ok(_) => debug!("registered tenant {}", seed.app_id),
            Err(e) => error!("could not register tenant {}: {e}", seed.app_id),
        }
    }

    info!("hub running with {} seeded tenants", config.tenants.len());

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    gateway.shutdown_all().await;

    Ok(())
}
