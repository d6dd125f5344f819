//! `config.json` loading.

use crate::{
    engine::Timeouts,
    registry::{default_watchlist, WatchedToken},
};
use eyre::Context as _;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DEFAULT_RPC_URL: &str = "https://eth.llamarpc.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcEndpoint {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub active: bool,
    /// Expected chain id; when set, `doctor` compares it with what the node reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletEntry {
    pub address: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DappEntry {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub connect_seconds: u64,
    pub balances_seconds: u64,
    pub call_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_seconds: 8,
            balances_seconds: 12,
            call_seconds: 10,
        }
    }
}

impl From<TimeoutConfig> for Timeouts {
    fn from(t: TimeoutConfig) -> Self {
        // Zero would make every call time out immediately.
        let secs = |v: u64, fallback: Duration| {
            if v == 0 {
                fallback
            } else {
                Duration::from_secs(v)
            }
        };
        let d = Self::default();
        Self {
            connect: secs(t.connect_seconds, d.connect),
            balances: secs(t.balances_seconds, d.balances),
            call: secs(t.call_seconds, d.call),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapdeckConfig {
    pub rpc_urls: Vec<RpcEndpoint>,
    pub wallets: Vec<WalletEntry>,
    pub dapps: Vec<DappEntry>,
    /// Also write JSON logs to the data dir.
    pub logger: bool,
    pub watchlist: Vec<WatchedToken>,
    pub timeouts: TimeoutConfig,
}

impl Default for SwapdeckConfig {
    fn default() -> Self {
        Self {
            rpc_urls: vec![RpcEndpoint {
                name: "llamarpc".into(),
                url: DEFAULT_RPC_URL.into(),
                active: true,
                chain_id: Some(1),
            }],
            wallets: vec![],
            dapps: vec![],
            logger: false,
            watchlist: default_watchlist(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl SwapdeckConfig {
    /// Read `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let mut cfg = if path.exists() {
            let s = fs::read_to_string(path)
                .with_context(|| format!("read {}", path.display()))?;
            serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))?
        } else {
            Self::default()
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        let Some(url) = std::env::var("SWAPDECK_RPC_URL")
            .ok()
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
        else {
            return;
        };
        for r in &mut self.rpc_urls {
            r.active = false;
        }
        self.rpc_urls.insert(
            0,
            RpcEndpoint {
                name: "env".into(),
                url,
                active: true,
                chain_id: None,
            },
        );
    }

    /// The active endpoint, or the first one when none is marked active.
    pub fn active_rpc(&self) -> Option<&RpcEndpoint> {
        self.rpc_urls
            .iter()
            .find(|r| r.active)
            .or_else(|| self.rpc_urls.first())
    }

    pub fn active_wallet(&self) -> Option<&WalletEntry> {
        self.wallets
            .iter()
            .find(|w| w.active)
            .or_else(|| self.wallets.first())
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() -> eyre::Result<()> {
        let dir = tempfile::tempdir()?;
        let cfg = SwapdeckConfig::load(&dir.path().join(CONFIG_FILE_NAME))?;
        assert_eq!(cfg.timeouts, TimeoutConfig::default());
        assert_eq!(cfg.watchlist.len(), default_watchlist().len());
        assert!(!cfg.logger);
        Ok(())
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() -> eyre::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            r#"{
              "rpc_urls": [
                {"name": "a", "url": "http://a.example", "active": false},
                {"name": "b", "url": "wss://b.example", "active": true}
              ],
              "wallets": [{"address": "0x1111111111111111111111111111111111111111", "name": "main"}],
              "logger": true,
              "timeouts": {"call_seconds": 3}
            }"#,
        )?;
        let cfg = SwapdeckConfig::load(&path)?;
        assert_eq!(cfg.active_rpc().map(|r| r.name.as_str()), Some("b"));
        assert_eq!(cfg.active_wallet().map(|w| w.name.as_str()), Some("main"));
        assert!(cfg.logger);
        assert_eq!(cfg.timeouts.call_seconds, 3);
        assert_eq!(cfg.timeouts.connect_seconds, 8, "unset fields keep defaults");
        assert_eq!(cfg.timeouts().call, Duration::from_secs(3));
        assert!(!cfg.watchlist.is_empty());
        Ok(())
    }

    #[test]
    fn malformed_file_is_an_error() -> eyre::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "{ not json")?;
        assert!(SwapdeckConfig::load(&path).is_err());
        Ok(())
    }

    #[test]
    fn zero_timeouts_fall_back_to_defaults() {
        let t: Timeouts = TimeoutConfig {
            connect_seconds: 0,
            balances_seconds: 5,
            call_seconds: 0,
        }
        .into();
        assert_eq!(t.connect, Duration::from_secs(8));
        assert_eq!(t.balances, Duration::from_secs(5));
        assert_eq!(t.call, Duration::from_secs(10));
    }
}
