//! Runtime configuration sourced from the environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::error::{DeployError, Result};
use crate::domain::request::Network;

/// Default per-invocation tool timeout.
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 300;

/// Default upload size cap (50 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Default retention for terminal jobs.
pub const DEFAULT_JOB_TTL_SECS: u64 = 3600;

/// Environment variable carrying the signing key into tool invocations.
pub const ENV_PRIVATE_KEY: &str = "APTOS_PRIVATE_KEY";

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Name or path of the external toolchain binary.
    pub aptos_bin: String,

    /// Signing key handed to publish invocations via the child environment.
    /// Never placed on a command line.
    pub private_key: Option<String>,

    /// Per-network fullnode URL overrides.
    pub node_url_devnet: Option<String>,
    pub node_url_testnet: Option<String>,
    pub node_url_mainnet: Option<String>,

    /// Wall-clock timeout applied to each tool invocation.
    pub job_timeout: Duration,

    /// Upload size cap in bytes.
    pub max_upload_bytes: u64,

    /// Root directory under which job work directories are created.
    pub work_root: PathBuf,

    /// Retention period for terminal jobs before registry eviction.
    pub job_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aptos_bin: "aptos".to_string(),
            private_key: None,
            node_url_devnet: None,
            node_url_testnet: None,
            node_url_mainnet: None,
            job_timeout: Duration::from_secs(DEFAULT_JOB_TIMEOUT_SECS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            work_root: env::temp_dir().join("movelift"),
            job_ttl: Duration::from_secs(DEFAULT_JOB_TTL_SECS),
        }
    }
}

impl Config {
    /// Build a configuration from `MOVELIFT_*` environment variables,
    /// falling back to defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Self {
            aptos_bin: env::var("MOVELIFT_APTOS_BIN").unwrap_or(defaults.aptos_bin),
            private_key: env::var("MOVELIFT_PRIVATE_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            node_url_devnet: env::var("MOVELIFT_NODE_URL_DEVNET").ok(),
            node_url_testnet: env::var("MOVELIFT_NODE_URL_TESTNET").ok(),
            node_url_mainnet: env::var("MOVELIFT_NODE_URL_MAINNET").ok(),
            job_timeout: env_secs("MOVELIFT_JOB_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.job_timeout),
            max_upload_bytes: env_u64("MOVELIFT_MAX_UPLOAD_BYTES")
                .unwrap_or(defaults.max_upload_bytes),
            work_root: env::var("MOVELIFT_WORK_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_root),
            job_ttl: env_secs("MOVELIFT_JOB_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.job_ttl),
        }
    }

    /// Fullnode URL for `network`, honoring any configured override.
    pub fn node_url(&self, network: Network) -> String {
        let override_url = match network {
            Network::Devnet => &self.node_url_devnet,
            Network::Testnet => &self.node_url_testnet,
            Network::Mainnet => &self.node_url_mainnet,
        };
        override_url
            .clone()
            .unwrap_or_else(|| network.default_node_url().to_string())
    }

    /// The configured signing key, or an error when absent.
    pub fn signing_key(&self) -> Result<&str> {
        self.private_key
            .as_deref()
            .ok_or(DeployError::MissingSigningKey)
    }
}

fn env_u64(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|value| value.parse().ok())
}

fn env_secs(name: &str) -> Option<u64> {
    env_u64(name).filter(|secs| *secs > 0)
}
