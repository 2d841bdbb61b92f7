//! Settings

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Service identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Info {
    /// Marker written on every authenticity record
    pub minted_by: String,
}

impl Default for Info {
    fn default() -> Self {
        Self {
            minted_by: "atelier-mint".to_string(),
        }
    }
}

/// Which ledger backend to wire
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    /// In-process fake, for development
    #[default]
    FakeLedger,
    /// Mint gateway HTTP API
    Gateway,
}

impl FromStr for LedgerBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fakeledger" => Ok(LedgerBackend::FakeLedger),
            "gateway" => Ok(LedgerBackend::Gateway),
            _ => Err(format!("Unknown ledger backend: {}", s)),
        }
    }
}

/// Which pinning backend to wire
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PinBackend {
    /// In-process fake, for development
    #[default]
    FakePinner,
    /// IPFS pinning service HTTP API
    Ipfs,
}

impl FromStr for PinBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fakepinner" => Ok(PinBackend::FakePinner),
            "ipfs" => Ok(PinBackend::Ipfs),
            _ => Err(format!("Unknown pin backend: {}", s)),
        }
    }
}

/// Ledger and mint client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger {
    /// Backend selection
    pub backend: LedgerBackend,
    /// Collection the authenticity certificates are minted into
    pub authenticity_collection: String,
    /// Collection the ownership tokens are minted into
    pub ownership_collection: String,
    /// Submission attempts inside the mint client
    pub max_attempts: u32,
    /// Fixed delay between submission attempts, in milliseconds
    pub retry_delay_ms: u64,
    /// Per-attempt submission timeout, in seconds
    pub call_timeout_secs: u64,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::default(),
            authenticity_collection: "0.0.4100".to_string(),
            ownership_collection: "0.0.4200".to_string(),
            max_attempts: 3,
            retry_delay_ms: 300,
            call_timeout_secs: 30,
        }
    }
}

/// Mint gateway credentials
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Gateway {
    /// Base URL of the gateway API
    pub api_url: String,
    /// Bearer token for the gateway API
    pub api_key: String,
}

/// Pinning service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pinning {
    /// Backend selection
    pub backend: PinBackend,
    /// Base URL of the pinning service API
    pub api_url: String,
    /// Bearer token for the pinning service
    pub token: String,
    /// Public gateway retrieval URLs are built on
    pub gateway_url: String,
    /// Upload timeout, in seconds
    pub timeout_secs: u64,
}

impl Default for Pinning {
    fn default() -> Self {
        Self {
            backend: PinBackend::default(),
            api_url: String::new(),
            token: String::new(),
            gateway_url: "https://gateway.example.com".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Queue and dispatcher settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Queue {
    /// Worker pool width
    pub workers: usize,
    /// Deliveries before a job is terminally failed
    pub max_attempts: u32,
    /// Delay before the second delivery, in seconds
    pub base_delay_secs: u64,
    /// Factor applied to the delay after each failed delivery
    pub backoff_multiplier: f64,
    /// Cadence of the housekeeping task, in seconds
    pub housekeeping_interval_secs: u64,
    /// Age after which terminal job records are purged, in seconds
    pub finished_job_ttl_secs: u64,
}

impl Default for Queue {
    fn default() -> Self {
        Self {
            workers: 4,
            max_attempts: 5,
            base_delay_secs: 30,
            backoff_multiplier: 2.0,
            housekeeping_interval_secs: 3_600,
            finished_job_ttl_secs: 7 * 24 * 3_600,
        }
    }
}

/// Daemon settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Service identity
    #[serde(default)]
    pub info: Info,
    /// Ledger and mint client settings
    #[serde(default)]
    pub ledger: Ledger,
    /// Mint gateway credentials
    #[serde(default)]
    pub gateway: Gateway,
    /// Pinning service settings
    #[serde(default)]
    pub pinning: Pinning,
    /// Queue and dispatcher settings
    #[serde(default)]
    pub queue: Queue,
}

impl Settings {
    /// Load settings from an optional TOML file with `ATELIER_` env overrides
    ///
    /// Missing sections fall back to their defaults, so an empty (or
    /// absent) file yields a runnable dev configuration on the fake
    /// backends.
    pub fn new(config_file_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = config_file_path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(Environment::with_prefix("ATELIER").separator("__"))
            .build()?;
        config.try_deserialize()
    }

    /// Mint client durations assembled from the raw settings
    pub fn mint_client_config(&self) -> atelier::MintClientConfig {
        atelier::MintClientConfig {
            max_attempts: self.ledger.max_attempts,
            retry_delay: Duration::from_millis(self.ledger.retry_delay_ms),
            call_timeout: Duration::from_secs(self.ledger.call_timeout_secs),
        }
    }

    /// Dispatcher configuration assembled from the raw settings
    pub fn dispatcher_config(&self) -> atelier::DispatcherConfig {
        atelier::DispatcherConfig {
            workers: self.queue.workers,
            retry: atelier::RetryPolicy {
                max_attempts: self.queue.max_attempts,
                base_delay: Duration::from_secs(self.queue.base_delay_secs),
                backoff_multiplier: self.queue.backoff_multiplier,
            },
            housekeeping_interval: Duration::from_secs(self.queue.housekeeping_interval_secs),
            finished_job_ttl: Duration::from_secs(self.queue.finished_job_ttl_secs),
        }
    }
}
