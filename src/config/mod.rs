use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

/// Default local development chain (anvil / hardhat)
pub const DEFAULT_CHAIN_ID: u64 = 31337;
const DEFAULT_RPC: &str = "http://localhost:8545";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: Option<String>,
    pub rpc: String,
}

impl ChainConfig {
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| format!("chain {}", self.chain_id))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub chains: Vec<ChainConfig>,

    /// Chain used when neither a flag nor a saved contract names one
    pub default_chain: Option<u64>,

    /// Endpoint whose node-managed accounts act as the wallet
    pub wallet_rpc: Option<String>,

    /// Pin one of the node's accounts instead of the first
    pub wallet_account: Option<String>,

    pub contracts_db: Option<PathBuf>,
}

impl Config {
    /// `--rpc`/`--chain-id` take precedence over the file
    pub fn apply_overrides(&mut self, rpc: Option<String>, chain_id: Option<u64>) {
        if let Some(chain_id) = chain_id {
            self.default_chain = Some(chain_id);
        }
        if let Some(rpc) = rpc {
            let chain_id = self.target_chain();
            self.chains.retain(|c| c.chain_id != chain_id);
            self.chains.push(ChainConfig {
                chain_id,
                name: None,
                rpc,
            });
        }
    }

    pub fn target_chain(&self) -> u64 {
        self.default_chain
            .or_else(|| self.chains.first().map(|c| c.chain_id))
            .unwrap_or(DEFAULT_CHAIN_ID)
    }

    /// Configured chains, or the local development node when none are
    pub fn chains(&self) -> Vec<ChainConfig> {
        if self.chains.is_empty() {
            return vec![ChainConfig {
                chain_id: self.target_chain(),
                name: Some("local".to_string()),
                rpc: DEFAULT_RPC.to_string(),
            }];
        }
        self.chains.clone()
    }

    /// The wallet endpoint, falling back to the target chain's RPC
    pub fn wallet_rpc(&self) -> Option<String> {
        self.wallet_rpc.clone().or_else(|| {
            let target = self.target_chain();
            self.chains()
                .into_iter()
                .find(|c| c.chain_id == target)
                .map(|c| c.rpc)
        })
    }

    pub fn contracts_db_path(&self) -> Option<PathBuf> {
        self.contracts_db
            .clone()
            .or_else(|| data_dir().map(|dir| dir.join("contracts.sqlite3")))
    }
}

pub fn load(explicit: Option<&Path>) -> Config {
    let Some(path) = explicit.map(Path::to_path_buf).or_else(config_path) else {
        return Config::default();
    };
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => {
            debug!(path = %path.display(), "no config file, using defaults");
            return Config::default();
        }
    };
    match toml::from_str::<Config>(&content) {
        Ok(config) => config,
        Err(err) => {
            warn!(path = %path.display(), %err, "invalid config file, using defaults");
            Config::default()
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("PROD_CONFIG").map(PathBuf::from) {
        return Some(path);
    }
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from) {
        return Some(xdg.join("prod").join("config.toml"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".config").join("prod").join("config.toml"));
    }

    directories::ProjectDirs::from("io", "prod", "prod")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

pub fn data_dir() -> Option<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_DATA_HOME").map(PathBuf::from) {
        return Some(xdg.join("prod"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".local").join("share").join("prod"));
    }
    directories::ProjectDirs::from("io", "prod", "prod").map(|dirs| dirs.data_dir().to_path_buf())
}
