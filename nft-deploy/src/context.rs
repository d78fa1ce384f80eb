use crate::config::{NetworkConfigError, NetworkSettings};

/// Everything a deploy script needs to know about where it runs.
///
/// Built once by the CLI from the config file, the command line and the environment, then passed
/// to every script. Scripts never read the process environment themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployContext {
    pub network: String,
    pub chain_id: u64,
    pub block_confirmations: u64,
    pub development_chains: Vec<String>,
    pub etherscan_api_key: Option<String>,
}

impl DeployContext {
    pub fn new(
        network: &str,
        chain_id: u64,
        settings: &NetworkSettings,
        development_chains: &[String],
        etherscan_api_key: Option<String>,
    ) -> Self {
        // An empty key counts as no key
        let etherscan_api_key = etherscan_api_key.filter(|key| !key.trim().is_empty());
        Self {
            network: network.to_string(),
            chain_id,
            block_confirmations: settings.confirmations(),
            development_chains: development_chains.to_vec(),
            etherscan_api_key,
        }
    }

    pub fn is_development(&self) -> bool {
        self.development_chains
            .iter()
            .any(|name| name == &self.network)
    }

    /// Explorer verification only happens on live networks with an API key configured.
    pub fn should_verify(&self) -> bool {
        !self.is_development() && self.etherscan_api_key.is_some()
    }
}

/// Picks the chain id of the active network, preferring the configured one.
pub fn resolve_chain_id(
    network: &str,
    configured: Option<u64>,
    node: u64,
) -> Result<u64, NetworkConfigError> {
    match configured {
        Some(configured) if configured != node => Err(NetworkConfigError::ChainIdMismatch {
            network: network.to_string(),
            configured,
            node,
        }),
        Some(configured) => Ok(configured),
        None => Ok(node),
    }
}
