//! Client configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ClientError, Result};
use crate::tracker::{LocalHandleRule, TrackerConfig};

/// Default directory for the local mirror
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("whistle-client")
}

/// Which membership hash implementation to use
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HashProviderConfig {
    /// Compute in process
    #[default]
    Digest,
    /// Delegate to a remote hashing service
    Remote { url: String },
}

/// Fee budgets in microcredits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Registration, membership and status calls
    #[serde(default = "default_call_fee")]
    pub call: u64,

    /// Report submission (larger circuit)
    #[serde(default = "default_report_fee")]
    pub report: u64,

    /// Pay fees from a private record
    #[serde(default)]
    pub private: bool,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            call: default_call_fee(),
            report: default_report_fee(),
            private: false,
        }
    }
}

/// Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Read endpoint base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Deployed program id
    #[serde(default = "default_program_id")]
    pub program_id: String,

    /// Directory holding the local mirror
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Delay between confirmation polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Polls before a submission is reported as timed out
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// Delay before a wallet-local handle is reported as sent
    #[serde(default = "default_local_handle_delay")]
    pub local_handle_delay_ms: u64,

    /// Substring marking a handle as wallet-local (not traceable on chain)
    #[serde(default = "default_local_handle_marker")]
    pub local_handle_marker: String,

    /// Dashboard refresh period
    #[serde(default = "default_dashboard_refresh")]
    pub dashboard_refresh_secs: u64,

    /// HTTP request timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub hash_provider: HashProviderConfig,

    #[serde(default)]
    pub fees: FeeConfig,
}

fn default_api_base() -> String {
    "https://api.explorer.provable.com/v1/testnet".to_string()
}

fn default_program_id() -> String {
    "zkwhistle_kumar_v1.aleo".to_string()
}

fn default_poll_interval() -> u64 {
    3000
}

fn default_max_poll_attempts() -> u32 {
    40
}

fn default_local_handle_delay() -> u64 {
    2000
}

fn default_local_handle_marker() -> String {
    "-".to_string()
}

fn default_dashboard_refresh() -> u64 {
    20
}

fn default_request_timeout() -> u64 {
    30
}

fn default_call_fee() -> u64 {
    500_000
}

fn default_report_fee() -> u64 {
    1_000_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            program_id: default_program_id(),
            data_dir: default_data_dir(),
            poll_interval_ms: default_poll_interval(),
            max_poll_attempts: default_max_poll_attempts(),
            local_handle_delay_ms: default_local_handle_delay(),
            local_handle_marker: default_local_handle_marker(),
            dashboard_refresh_secs: default_dashboard_refresh(),
            request_timeout_secs: default_request_timeout(),
            hash_provider: HashProviderConfig::default(),
            fees: FeeConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load config from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| ClientError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from `path` if it exists, defaults otherwise
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ClientError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_base.trim().is_empty() {
            return Err(ClientError::Config("api_base must not be empty".into()));
        }
        if !self.program_id.ends_with(".aleo") {
            return Err(ClientError::Config(format!(
                "program_id must end with .aleo, got {}",
                self.program_id
            )));
        }
        if self.max_poll_attempts == 0 {
            return Err(ClientError::Config("max_poll_attempts must be at least 1".into()));
        }
        if self.dashboard_refresh_secs == 0 {
            return Err(ClientError::Config("dashboard_refresh_secs must be at least 1".into()));
        }
        if self.local_handle_marker.is_empty() {
            return Err(ClientError::Config("local_handle_marker must not be empty".into()));
        }
        if let HashProviderConfig::Remote { url } = &self.hash_provider {
            if url.trim().is_empty() {
                return Err(ClientError::Config("remote hash provider needs a url".into()));
            }
        }
        Ok(())
    }

    /// Base URL without a trailing slash
    pub fn api_base(&self) -> &str {
        self.api_base.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn dashboard_refresh(&self) -> Duration {
        Duration::from_secs(self.dashboard_refresh_secs)
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: self.max_poll_attempts,
            local_delay: Duration::from_millis(self.local_handle_delay_ms),
            local_rule: LocalHandleRule::Contains(self.local_handle_marker.clone()),
        }
    }
}
