mod artifacts;
mod config;
mod context;
mod deployments;
mod environment;
mod rpc;
mod runner;
mod scripts;
#[cfg(test)]
mod testing;
mod verify;
mod vrf;

use std::path::PathBuf;

use clap::Parser;
use miette::{IntoDiagnostic, WrapErr};
use tokio::runtime::Runtime;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    artifacts::ArtifactStore,
    config::DeployConfig,
    context::{resolve_chain_id, DeployContext},
    deployments::DeploymentStore,
    environment::{DeployEnvironment, Verifier},
    rpc::{IndexedAccounts, RPCProvider, RpcDeployer},
    runner::DeployRunner,
    verify::EtherscanVerifier,
    vrf::CoordinatorClient,
};

#[derive(Parser, Debug)]
#[command(version, about = "Deploy the NFT contracts and set up their VRF subscription")]
struct Args {
    /// Name of the network to deploy to, as defined in the config file
    #[arg(long, default_value = "hardhat")]
    network: String,

    /// Deployment config YAML
    #[arg(long, default_value = "helper-config.yaml")]
    config: PathBuf,

    /// Only run scripts with one of these tags
    #[arg(long, value_delimiter = ',', default_value = "all")]
    tags: Vec<String>,

    /// Directory holding the compiled contract artifacts
    #[arg(long, default_value = "artifacts")]
    artifacts: PathBuf,

    /// Directory where deployments are recorded
    #[arg(long, default_value = "deployments")]
    deployments: PathBuf,

    /// Overrides the RPC URL of the network
    #[arg(long, env = "RPC_URL")]
    rpc_url: Option<String>,

    /// Deployer key. Without it the node's unlocked accounts are used.
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    /// Enables contract verification on live networks
    #[arg(long, env = "ETHERSCAN_API_KEY", hide_env_values = true)]
    etherscan_api_key: Option<String>,
}

/// Verifier used when no explorer credentials are configured
struct NoVerifier;

#[async_trait::async_trait]
impl Verifier for NoVerifier {
    async fn verify(
        &self,
        contract_name: &str,
        _address: alloy::primitives::Address,
        _constructor_args: &[alloy::dyn_abi::DynSolValue],
    ) -> miette::Result<()> {
        Err(miette::miette!("Cannot verify {contract_name}: no ETHERSCAN_API_KEY configured"))
    }
}

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = DeployConfig::load(&args.config)?;

    let rt = Runtime::new()
        .into_diagnostic()
        .wrap_err("Failed to start runtime")?;
    rt.block_on(deploy(args, config))
}

async fn deploy(args: Args, config: DeployConfig) -> miette::Result<()> {
    let settings = config
        .network(&args.network)
        .into_diagnostic()?;
    let rpc_url = args
        .rpc_url
        .as_deref()
        .unwrap_or(&settings.rpc_url);

    let rpc = RPCProvider::new(rpc_url, args.private_key.as_deref())?;
    let chain_id = resolve_chain_id(&args.network, settings.chain_id, rpc.chain_id().await?)
        .into_diagnostic()?;
    let context = DeployContext::new(
        &args.network,
        chain_id,
        settings,
        &config.development_chains,
        args.etherscan_api_key,
    );
    info!(
        "Network {} (chain {chain_id}), development: {}",
        context.network,
        context.is_development()
    );

    let artifacts = ArtifactStore::new(&args.artifacts);
    let store = DeploymentStore::open(&args.deployments, &context.network, chain_id)?;

    let accounts = IndexedAccounts::new(&rpc, config.named_accounts.deployer);
    let deployer = RpcDeployer::new(&rpc, artifacts.clone(), store);
    let coordinator = CoordinatorClient::new(&rpc);
    let verifier: Box<dyn Verifier> = match &context.etherscan_api_key {
        Some(api_key) => Box::new(EtherscanVerifier::new(
            config.etherscan.clone(),
            api_key.clone(),
            chain_id,
            artifacts,
        )),
        None => Box::new(NoVerifier),
    };

    let env = DeployEnvironment {
        context: &context,
        config: &config,
        accounts: &accounts,
        deployer: &deployer,
        verifier: verifier.as_ref(),
        coordinator: &coordinator,
    };

    DeployRunner::new(args.tags)
        .run(&env)
        .await
}
