use anyhow::Context;
use archipelago::{Coordinator, CoordinatorConfig, HttpIslandClient, Shutdown};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Configuration errors abort before any island is contacted.
    let config = CoordinatorConfig::from_env().context("Invalid coordinator configuration")?;
    info!(
        config = %serde_json::to_string(&config)?,
        "Loaded configuration"
    );

    let (trigger, shutdown) = Shutdown::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Shutdown requested, cancelling in-flight island calls");
            trigger.trigger();
        }
    });

    let client = HttpIslandClient::new(config.deadlines.island_call, config.deadlines.init_call)?;
    let coordinator = Coordinator::new(Arc::new(client), config, shutdown)?;
    let summary = coordinator.run().await?;

    info!("============================================");
    info!("OPTIMIZATION COMPLETE");
    info!("Total time: {:.2?}", summary.elapsed);
    info!(
        "Stop reason: {:?} after {} cycles ({} generations)",
        summary.stop_reason, summary.cycles_run, summary.total_generations
    );
    match summary.global_best {
        Some(best) => info!("Best Sharpe ratio found: {:.5}", best),
        None => warn!("No island reported a Sharpe ratio"),
    }
    if let Some(best) = &summary.best_island {
        info!("Best island at shutdown: {} ({:.5})", best.island, best.fitness);
    }
    info!("============================================");
    Ok(())
}
