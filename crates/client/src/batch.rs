//! Sequential multi-file sends.

use std::path::PathBuf;

use tracing::{error, info};

use crate::ClientError;
use crate::client::{TransferClient, TransferReport};
use crate::connector::Connector;

/// What to do when one file of a batch fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BatchPolicy {
    /// Log the failure and go on with the next file.
    #[default]
    ContinueOnError,
    /// Stop at the first failure.
    FailFast,
}

/// Outcome for a single file of a batch.
#[derive(Debug)]
pub struct FileResult {
    pub path: PathBuf,
    pub result: Result<TransferReport, ClientError>,
}

/// Outcomes of every file that was attempted, in order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<FileResult>,
    /// The batch stopped early because the client was cancelled.
    pub cancelled: bool,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }
}

impl<C: Connector> TransferClient<C> {
    /// Sends `paths` one after another, each with its own attempt budget.
    pub async fn send_batch(&self, paths: &[PathBuf], policy: BatchPolicy) -> BatchReport {
        let mut report = BatchReport::default();

        for (index, path) in paths.iter().enumerate() {
            if self.is_cancelled() {
                report.cancelled = true;
                info!(skipped = paths.len() - index, "cancelled: stopping batch");
                break;
            }

            let result = self.send_file(path).await;
            if matches!(result, Err(ClientError::Cancelled)) {
                report.cancelled = true;
                report.results.push(FileResult {
                    path: path.clone(),
                    result,
                });
                info!(skipped = paths.len() - index - 1, "cancelled: stopping batch");
                break;
            }

            let failed = result.is_err();
            if let Err(e) = &result {
                error!(path = %path.display(), "file {} of {} failed: {e}", index + 1, paths.len());
            }
            report.results.push(FileResult {
                path: path.clone(),
                result,
            });

            if failed && policy == BatchPolicy::FailFast {
                info!(skipped = paths.len() - index - 1, "fail-fast: stopping batch");
                break;
            }
        }

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            cancelled = report.cancelled,
            "batch finished"
        );
        report
    }
}
