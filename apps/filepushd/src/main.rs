//! filepush receiving daemon entry point.

mod app;
mod config;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting filepushd");

    let config = config::load()?;
    tracing::info!(
        addr = %config.bind_addr(),
        root = %config.root_dir.display(),
        max_workers = config.max_workers,
        "configuration loaded"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config))?;

    tracing::info!("filepushd shut down cleanly");
    Ok(())
}
