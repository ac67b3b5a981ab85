//! filepush: send files to a filepush server.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use filepush_client::{BatchPolicy, BatchReport, ClientConfig, TcpConnector, TransferClient};

/// Send files to a filepush server, resuming interrupted transfers
#[derive(Parser, Debug)]
#[command(name = "filepush")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Server host name or address
    server_host: String,

    /// Server TCP port
    server_port: u16,

    /// Files to send, in order
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Stop at the first file that fails
    #[arg(long)]
    fail_fast: bool,

    /// Connection attempts per file
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    /// Seconds to wait between attempts
    #[arg(long, default_value_t = 5)]
    retry_delay_secs: u64,

    /// Bytes read from disk per chunk
    #[arg(long, default_value_t = 64 * 1024)]
    chunk_size: usize,

    /// Socket timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn client_config(&self) -> ClientConfig {
        ClientConfig {
            chunk_size: self.chunk_size.max(1),
            socket_timeout_ms: self.timeout_secs.saturating_mul(1000),
            max_attempts: self.max_attempts,
            retry_delay_ms: self.retry_delay_secs.saturating_mul(1000),
        }
    }

    fn policy(&self) -> BatchPolicy {
        if self.fail_fast {
            BatchPolicy::FailFast
        } else {
            BatchPolicy::ContinueOnError
        }
    }
}

/// Exit status for a finished batch: only fail-fast or an interrupted batch
/// turns into a non-zero exit.
fn exit_code(report: &BatchReport, policy: BatchPolicy) -> ExitCode {
    if report.cancelled || (policy == BatchPolicy::FailFast && !report.all_succeeded()) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let policy = cli.policy();
    let cancel = CancellationToken::new();
    let connector = TcpConnector::new(&cli.server_host, cli.server_port);
    let client = TransferClient::new(connector, cli.client_config()).with_cancel(cancel.clone());

    tracing::info!(
        server = %format!("{}:{}", cli.server_host, cli.server_port),
        files = cli.files.len(),
        "starting transfer"
    );

    let batch = client.send_batch(&cli.files, policy);
    tokio::pin!(batch);

    let finished = tokio::select! {
        report = &mut batch => Some(report),
        _ = tokio::signal::ctrl_c() => None,
    };
    let report = match finished {
        Some(report) => report,
        None => {
            tracing::info!("SIGINT received, cancelling");
            cancel.cancel();
            batch.await
        }
    };

    for file in &report.results {
        match &file.result {
            Ok(r) => tracing::info!(
                filename = %r.filename,
                size = r.file_size,
                resumed_from = r.resumed_from,
                attempts = r.attempts,
                "sent"
            ),
            Err(e) => tracing::warn!(path = %file.path.display(), "not sent: {e}"),
        }
    }

    Ok(exit_code(&report, policy))
}
