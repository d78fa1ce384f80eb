use std::{
    collections::BTreeMap,
    error::Error as StdError,
    fmt,
    path::Path,
};

use alloy::primitives::{Address, B256, U256};
use figment::{
    providers::{Format, Yaml},
    Figment,
};
use miette::{IntoDiagnostic, WrapErr};
use serde::{de::Error as _, Deserialize, Deserializer};
use tracing::{debug, info};

/// Errors raised while resolving network or per-chain deployment parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkConfigError {
    UnknownChain(u64),
    UnknownNetwork(String),
    MissingField { chain_id: u64, field: &'static str },
    ChainIdMismatch { network: String, configured: u64, node: u64 },
}

impl fmt::Display for NetworkConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkConfigError::UnknownChain(chain_id) => {
                write!(f, "No network config found for chain id {chain_id}")
            }
            NetworkConfigError::UnknownNetwork(name) => {
                write!(f, "Network '{name}' is not defined in the config file")
            }
            NetworkConfigError::MissingField { chain_id, field } => {
                write!(f, "Network config for chain id {chain_id} has no '{field}'")
            }
            NetworkConfigError::ChainIdMismatch { network, configured, node } => write!(
                f,
                "Network '{network}' is configured with chain id {configured} but the node reports {node}"
            ),
        }
    }
}

impl StdError for NetworkConfigError {}

/// VRF and mint parameters of a single chain
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ChainEntry {
    pub name: String,
    #[serde(default)]
    pub vrf_coordinator_v2: Option<Address>,
    #[serde(default)]
    pub subscription_id: Option<u64>,
    pub gas_lane: B256,
    pub callback_gas_limit: u32,
    pub mint_fee: U256,
}

impl ChainEntry {
    pub fn vrf_coordinator(&self, chain_id: u64) -> Result<Address, NetworkConfigError> {
        self.vrf_coordinator_v2
            .ok_or(NetworkConfigError::MissingField { chain_id, field: "vrf_coordinator_v2" })
    }

    pub fn subscription(&self, chain_id: u64) -> Result<u64, NetworkConfigError> {
        self.subscription_id
            .ok_or(NetworkConfigError::MissingField { chain_id, field: "subscription_id" })
    }
}

/// Static table of chain entries keyed by chain id.
///
/// Keys are written as strings in the YAML file and parsed on load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkConfig(BTreeMap<u64, ChainEntry>);

impl NetworkConfig {
    pub fn entry(&self, chain_id: u64) -> Result<&ChainEntry, NetworkConfigError> {
        self.0
            .get(&chain_id)
            .ok_or(NetworkConfigError::UnknownChain(chain_id))
    }

    pub fn chain_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.0.keys().copied()
    }
}

impl FromIterator<(u64, ChainEntry)> for NetworkConfig {
    fn from_iter<I: IntoIterator<Item = (u64, ChainEntry)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for NetworkConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, ChainEntry>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(key, entry)| {
                key.trim()
                    .parse::<u64>()
                    .map(|chain_id| (chain_id, entry))
                    .map_err(|_| D::Error::custom(format!("invalid chain id '{key}'")))
            })
            .collect()
    }
}

/// Connection settings of a named network
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct NetworkSettings {
    #[serde(default)]
    pub chain_id: Option<u64>,
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default)]
    pub block_confirmations: Option<u64>,
}

impl NetworkSettings {
    pub fn confirmations(&self) -> u64 {
        self.block_confirmations.unwrap_or(1)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct NamedAccountsSettings {
    /// Account index used as the deployer
    #[serde(default)]
    pub deployer: usize,
}

impl Default for NamedAccountsSettings {
    fn default() -> Self {
        Self { deployer: 0 }
    }
}

/// Constructor arguments of the local VRF coordinator mock
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MocksSettings {
    #[serde(default = "default_base_fee")]
    pub base_fee: U256,
    #[serde(default = "default_gas_price_link")]
    pub gas_price_link: U256,
    /// LINK funded into freshly created mock subscriptions. Skipped when unset.
    #[serde(default)]
    pub fund_amount: Option<U256>,
}

impl Default for MocksSettings {
    fn default() -> Self {
        Self { base_fee: default_base_fee(), gas_price_link: default_gas_price_link(), fund_amount: None }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct EtherscanSettings {
    #[serde(default = "default_etherscan_url")]
    pub api_url: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
}

impl Default for EtherscanSettings {
    fn default() -> Self {
        Self {
            api_url: default_etherscan_url(),
            poll_interval_secs: default_poll_interval(),
            max_polls: default_max_polls(),
        }
    }
}

/// Main deployment configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DeployConfig {
    #[serde(default = "default_development_chains")]
    pub development_chains: Vec<String>,
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkSettings>,
    #[serde(default)]
    pub network_config: NetworkConfig,
    #[serde(default)]
    pub named_accounts: NamedAccountsSettings,
    #[serde(default)]
    pub mocks: MocksSettings,
    #[serde(default)]
    pub etherscan: EtherscanSettings,
}

impl DeployConfig {
    pub fn load(path: &Path) -> miette::Result<Self> {
        info!("Config YAML: {}", path.display());
        let config = Self::from_figment(Figment::new().merge(Yaml::file(path)))?;
        debug!(
            "VRF parameters configured for chains {:?}",
            config
                .network_config
                .chain_ids()
                .collect::<Vec<_>>()
        );
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> miette::Result<Self> {
        figment
            .extract::<DeployConfig>()
            .into_diagnostic()
            .wrap_err("Failed to load deployment configuration:")
    }

    pub fn network(&self, name: &str) -> Result<&NetworkSettings, NetworkConfigError> {
        self.networks
            .get(name)
            .ok_or_else(|| NetworkConfigError::UnknownNetwork(name.to_string()))
    }
}

fn default_rpc_url() -> String {
    "http://127.0.0.1:8545".to_string()
}

fn default_development_chains() -> Vec<String> {
    vec!["hardhat".to_string(), "localhost".to_string()]
}

// 0.25 LINK premium per request
fn default_base_fee() -> U256 {
    U256::from(250_000_000_000_000_000u64)
}

fn default_gas_price_link() -> U256 {
    U256::from(1_000_000_000u64)
}

fn default_etherscan_url() -> String {
    "https://api.etherscan.io/v2/api".to_string()
}

fn default_poll_interval() -> u64 {
    5
}

fn default_max_polls() -> u32 {
    20
}
