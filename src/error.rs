use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("precondition failed on {path}")]
    PreconditionFailed { path: String },
    #[error("registry leader changed")]
    NotLeader,
    #[error("registry transport error: {0}")]
    Transport(String),
}

impl RegistryError {
    /// Whether the identical transaction may be submitted again.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, RegistryError::PreconditionFailed { .. })
    }
}

#[derive(Error, Debug)]
pub enum RepairError {
    #[error("failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("timestamp formatter produced an empty string")]
    Timestamp,

    #[error("failed to commit repair operation: {source}\n{operation}")]
    Registry {
        operation: String,
        #[source]
        source: RegistryError,
    },

    #[error("job {job_id} failed\n{operation}")]
    JobFailed { job_id: u64, operation: String },
    #[error("timed out waiting for job {job_id}\n{operation}")]
    JobTimeout { job_id: u64, operation: String },
}
