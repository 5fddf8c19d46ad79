use crate::error::{ChainplanError, Result};
use crate::paths;
use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// NetworkConfig
// ---------------------------------------------------------------------------

/// First account of the usual development mnemonic; only meaningful to the
/// simulated chain, which derives contract addresses from it.
pub const DEFAULT_SIMULATED_SENDER: Address = address!("90f8bf6a479f320ead074411a4b0e7944ea8c9c1");

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NetworkConfig {
    /// In-process chain with deterministic addresses. Nothing leaves the machine.
    Simulated {
        #[serde(default = "default_simulated_sender")]
        from: Address,
    },
    /// A node reached over JSON-RPC that signs for `from` itself.
    JsonRpc {
        url: String,
        from: Address,
        #[serde(default)]
        chain_id: Option<u64>,
        #[serde(default = "default_confirmations")]
        confirmations: u64,
        #[serde(default = "default_poll_interval_ms")]
        poll_interval_ms: u64,
        #[serde(default = "default_receipt_timeout_secs")]
        receipt_timeout_secs: u64,
        #[serde(default = "default_request_timeout_secs")]
        request_timeout_secs: u64,
        #[serde(default)]
        gas: Option<u64>,
    },
}

fn default_simulated_sender() -> Address {
    DEFAULT_SIMULATED_SENDER
}

fn default_confirmations() -> u64 {
    1
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_receipt_timeout_secs() -> u64 {
    300
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl NetworkConfig {
    pub fn sender(&self) -> Address {
        match self {
            Self::Simulated { from } | Self::JsonRpc { from, .. } => *from,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Simulated { .. } => "simulated",
            Self::JsonRpc { .. } => "json_rpc",
        }
    }

    pub fn poll_interval(&self) -> Duration {
        match self {
            Self::JsonRpc {
                poll_interval_ms, ..
            } => Duration::from_millis(*poll_interval_ms),
            Self::Simulated { .. } => Duration::ZERO,
        }
    }

    pub fn receipt_timeout(&self) -> Duration {
        match self {
            Self::JsonRpc {
                receipt_timeout_secs,
                ..
            } => Duration::from_secs(*receipt_timeout_secs),
            Self::Simulated { .. } => Duration::ZERO,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        match self {
            Self::JsonRpc {
                request_timeout_secs,
                ..
            } => Duration::from_secs(*request_timeout_secs),
            Self::Simulated { .. } => Duration::ZERO,
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: String,
    #[serde(default = "default_plan")]
    pub plan: PathBuf,
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkConfig>,
}

fn default_version() -> u32 {
    1
}

fn default_plan() -> PathBuf {
    PathBuf::from(paths::DEFAULT_PLAN_FILE)
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("build/contracts")
}

impl Config {
    pub fn new(project: impl Into<String>) -> Self {
        let mut networks = BTreeMap::new();
        networks.insert(
            "development".to_string(),
            NetworkConfig::Simulated {
                from: DEFAULT_SIMULATED_SENDER,
            },
        );
        Self {
            version: default_version(),
            project: project.into(),
            plan: default_plan(),
            artifacts_dir: default_artifacts_dir(),
            networks,
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        crate::io::read_yaml(&paths::config_path(root))?
            .ok_or(ChainplanError::NotInitialized)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        crate::io::write_yaml(&paths::config_path(root), self)
    }

    pub fn network(&self, name: &str) -> Result<&NetworkConfig> {
        self.networks
            .get(name)
            .ok_or_else(|| ChainplanError::UnknownNetwork(name.to_string()))
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self, root: &Path) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.networks.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "no networks configured; `chainplan run` has nowhere to deploy".into(),
            });
        }

        if !paths::plan_path(root, &self.plan).exists() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!("plan file '{}' does not exist", self.plan.display()),
            });
        }

        for (name, network) in &self.networks {
            if network.sender() == Address::ZERO {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("network '{name}': sender is the zero address"),
                });
            }
            if let NetworkConfig::JsonRpc {
                url,
                poll_interval_ms,
                receipt_timeout_secs,
                request_timeout_secs,
                ..
            } = network
            {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Error,
                        message: format!("network '{name}': url must be http(s), got '{url}'"),
                    });
                }
                if *poll_interval_ms == 0 {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Error,
                        message: format!("network '{name}': poll_interval_ms must be > 0"),
                    });
                }
                if *receipt_timeout_secs == 0 {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Warning,
                        message: format!(
                            "network '{name}': receipt_timeout_secs is 0, every receipt wait will time out"
                        ),
                    });
                }
                if *request_timeout_secs == 0 {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Error,
                        message: format!("network '{name}': request_timeout_secs must be > 0"),
                    });
                }
            }
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn new_config_has_simulated_development_network() {
        let cfg = Config::new("vaults");
        assert_eq!(cfg.networks.len(), 1);
        assert_eq!(cfg.network("development").unwrap().kind(), "simulated");
    }

    #[test]
    fn load_missing_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(ChainplanError::NotInitialized)
        ));
    }

    #[test]
    fn save_load_preserves_networks() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::new("vaults");
        cfg.networks.insert(
            "bsc_testnet".into(),
            NetworkConfig::JsonRpc {
                url: "http://127.0.0.1:8545".into(),
                from: DEFAULT_SIMULATED_SENDER,
                chain_id: Some(97),
                confirmations: 2,
                poll_interval_ms: 500,
                receipt_timeout_secs: 60,
                request_timeout_secs: 15,
                gas: None,
            },
        );
        cfg.save(dir.path()).unwrap();

        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.networks, cfg.networks);
        assert_eq!(loaded.plan, PathBuf::from("deploy.yaml"));
    }

    #[test]
    fn json_rpc_defaults_apply() {
        let yaml = r#"
project: vaults
networks:
  local:
    type: json_rpc
    url: http://localhost:8545
    from: "0x90F8bf6A479f320ead074411a4B0e7944Ea8c9C1"
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        let net = cfg.network("local").unwrap();
        assert_eq!(net.poll_interval(), Duration::from_secs(1));
        assert_eq!(net.receipt_timeout(), Duration::from_secs(300));
        assert_eq!(net.request_timeout(), Duration::from_secs(30));
        match net {
            NetworkConfig::JsonRpc { confirmations, .. } => assert_eq!(*confirmations, 1),
            other => panic!("expected json_rpc, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_zero_request_timeout() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::new("vaults");
        cfg.networks.insert(
            "local".into(),
            NetworkConfig::JsonRpc {
                url: "http://localhost:8545".into(),
                from: DEFAULT_SIMULATED_SENDER,
                chain_id: None,
                confirmations: 1,
                poll_interval_ms: 1000,
                receipt_timeout_secs: 300,
                request_timeout_secs: 0,
                gas: None,
            },
        );
        let warnings = cfg.validate(dir.path());
        assert!(warnings.iter().any(|w| w.level == WarnLevel::Error
            && w.message == "network 'local': request_timeout_secs must be > 0"));
    }

    #[test]
    fn unknown_network_errors() {
        let cfg = Config::new("vaults");
        assert!(matches!(
            cfg.network("mainnet"),
            Err(ChainplanError::UnknownNetwork(n)) if n == "mainnet"
        ));
    }

    #[test]
    fn validate_flags_bad_url_and_missing_plan() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::new("vaults");
        cfg.networks.insert(
            "broken".into(),
            NetworkConfig::JsonRpc {
                url: "ws://localhost".into(),
                from: DEFAULT_SIMULATED_SENDER,
                chain_id: None,
                confirmations: 1,
                poll_interval_ms: 0,
                receipt_timeout_secs: 10,
                request_timeout_secs: 30,
                gas: None,
            },
        );
        let warnings = cfg.validate(dir.path());
        let errors: Vec<_> = warnings
            .iter()
            .filter(|w| w.level == WarnLevel::Error)
            .collect();
        assert_eq!(errors.len(), 2, "{warnings:?}");
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("plan file 'deploy.yaml'")));
    }
}
