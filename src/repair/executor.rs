use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};
use typed_builder::TypedBuilder;

use super::operation::RepairOperation;
use super::translator::TransactionTranslator;
use crate::config::Configuration;
use crate::error::{RegistryError, RepairError};
use crate::registry::{failed_job_path, finished_job_path, Registry, WriteTransaction};

#[derive(Debug, Clone, TypedBuilder)]
pub struct ExecutorSettings {
    #[builder(default = 3)]
    pub max_commit_retries: u32,
    #[builder(default = Duration::from_millis(200))]
    pub retry_backoff: Duration,
    #[builder(default = true)]
    pub wait_for_jobs: bool,
    #[builder(default = Duration::from_millis(500))]
    pub job_poll_interval: Duration,
    #[builder(default = Duration::from_secs(600))]
    pub job_timeout: Duration,
}

impl From<&Configuration> for ExecutorSettings {
    fn from(c: &Configuration) -> Self {
        Self {
            max_commit_retries: c.max_commit_retries,
            retry_backoff: Duration::from_millis(c.retry_backoff_ms),
            wait_for_jobs: c.wait_for_jobs,
            job_poll_interval: Duration::from_millis(c.job_poll_interval_ms),
            job_timeout: Duration::from_secs(c.job_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedOperation {
    pub kind: &'static str,
    pub job_id: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub applied: Vec<AppliedOperation>,
}

/// Applies a repair plan one operation at a time.
///
/// Each operation is committed before the next one is translated. A failed
/// precondition ends the run: the plan was built against state that no
/// longer holds and has to be recomputed.
pub struct RepairExecutor<R: Registry> {
    registry: R,
    translator: TransactionTranslator,
    settings: ExecutorSettings,
}

impl<R: Registry> RepairExecutor<R> {
    pub fn new(registry: R, translator: TransactionTranslator, settings: ExecutorSettings) -> Self {
        Self {
            registry,
            translator,
            settings,
        }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub async fn run(&self, ops: &[RepairOperation]) -> Result<RepairReport, RepairError> {
        let mut report = RepairReport::default();

        for op in ops.iter() {
            info!("applying repair operation:\n{op}");

            let translation = self.translator.translate(op)?;
            self.commit(&translation.transaction)
                .await
                .map_err(|source| {
                    error!("repair operation failed, err: {source}\n{op}");
                    RepairError::Registry {
                        operation: op.to_string(),
                        source,
                    }
                })?;

            if let Some(job_id) = translation.job_id {
                info!("queued job {job_id} for {}", op.kind_name());
                if self.settings.wait_for_jobs {
                    self.wait_for_job(job_id, op).await?;
                }
            }

            report.applied.push(AppliedOperation {
                kind: op.kind_name(),
                job_id: translation.job_id,
            });
        }

        info!("applied {} repair operations", report.applied.len());
        Ok(report)
    }

    async fn commit(&self, tx: &WriteTransaction) -> Result<(), RegistryError> {
        let mut attempt = 0;
        loop {
            match self.registry.write(tx).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < self.settings.max_commit_retries => {
                    attempt += 1;
                    warn!(
                        "registry write failed, retrying ({attempt}/{}), err: {e}",
                        self.settings.max_commit_retries
                    );
                    sleep(self.settings.retry_backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn wait_for_job(&self, job_id: u64, op: &RepairOperation) -> Result<(), RepairError> {
        let deadline = Instant::now() + self.settings.job_timeout;
        let finished = finished_job_path(job_id);
        let failed = failed_job_path(job_id);

        loop {
            match self.registry.get(&finished).await {
                Ok(Some(_)) => {
                    info!("job {job_id} finished");
                    return Ok(());
                }
                Ok(None) => {}
                Err(e) => warn!("failed to read {finished}, err: {e}"),
            }

            match self.registry.get(&failed).await {
                Ok(Some(_)) => {
                    error!("job {job_id} failed\n{op}");
                    return Err(RepairError::JobFailed {
                        job_id,
                        operation: op.to_string(),
                    });
                }
                Ok(None) => {}
                Err(e) => warn!("failed to read {failed}, err: {e}"),
            }

            if Instant::now() >= deadline {
                return Err(RepairError::JobTimeout {
                    job_id,
                    operation: op.to_string(),
                });
            }

            sleep(self.settings.job_poll_interval).await;
        }
    }
}
