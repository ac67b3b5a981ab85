use std::sync::Arc;

use filepush_server::{ServerConfig, TransferServer};
use tokio_util::sync::CancellationToken;

/// Serves until Ctrl-C, then lets in-flight transfers finish.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&config.root_dir).await?;

    let cancel = CancellationToken::new();
    let server = TransferServer::new(config, cancel.clone());
    let listener = server.bind().await?;

    let serving = Arc::clone(&server);
    let mut serve = tokio::spawn(async move { serving.serve(listener).await });

    tokio::select! {
        result = &mut serve => {
            // The accept loop only returns on its own after an error.
            result??;
            return Ok(());
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("SIGINT received, shutting down");
        }
    }

    cancel.cancel();
    serve.await??;
    Ok(())
}
