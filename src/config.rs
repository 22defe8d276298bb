use std::fs::read_to_string;

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{self, Deserialize};
use tracing::{debug, error, info};

pub const DEFAULT_CONFIG_FILE: &str = "/etc/cluster-repair/config.toml";

pub static CONFIG: Lazy<RwLock<Configuration>> = Lazy::new(Default::default);

/// Identity of this server, recorded as the creator of queued jobs.
pub fn get_self_name() -> String {
    CONFIG.read().name.clone()
}

fn default_name() -> String {
    "repair-1".to_string()
}

fn default_max_commit_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    200
}

fn default_wait_for_jobs() -> bool {
    true
}

fn default_job_poll_interval_ms() -> u64 {
    500
}

fn default_job_timeout_secs() -> u64 {
    600
}

#[derive(Deserialize, Debug, Clone)]
pub struct Configuration {
    #[serde(default = "default_name")]
    pub name: String,
    pub registry_url: Option<String>,

    #[serde(default = "default_max_commit_retries")]
    pub max_commit_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_wait_for_jobs")]
    pub wait_for_jobs: bool,
    #[serde(default = "default_job_poll_interval_ms")]
    pub job_poll_interval_ms: u64,
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: default_name(),
            registry_url: None,
            max_commit_retries: default_max_commit_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            wait_for_jobs: default_wait_for_jobs(),
            job_poll_interval_ms: default_job_poll_interval_ms(),
            job_timeout_secs: default_job_timeout_secs(),
        }
    }
}

impl Configuration {
    pub fn parse_config_file(file: &str) -> Result<Configuration> {
        info!("parsing configuration file: {}", file);

        let file_contents = read_to_string(file)
            .inspect_err(|e| error!("failed to read configuration file {file}, err: {e}"))?;

        Self::parse_config_str(&file_contents)
    }

    pub fn parse_config_str(contents: &str) -> Result<Configuration> {
        let ret: Configuration = toml::from_str(contents).map_err(|e| {
            error!("failed to parse configuration, err: {e}");
            anyhow!("invalid toml: {e}")
        })?;

        validate_configuration(&ret)?;

        debug!("configuration: {:?}", ret);
        Ok(ret)
    }
}

fn validate_configuration(config: &Configuration) -> Result<()> {
    if config.name.is_empty() {
        return Err(anyhow!("server name must not be empty"));
    }

    if config.job_poll_interval_ms == 0 {
        return Err(anyhow!("job_poll_interval_ms must be positive"));
    }

    Ok(())
}

pub fn init_config(config_file: &str) -> Result<()> {
    let conf = Configuration::parse_config_file(config_file)
        .inspect_err(|_| error!("failed to initialize config module"))?;

    *CONFIG.write() = conf;

    info!("successfully initialized config module");
    Ok(())
}
