use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, B256, U256},
};
use miette::IntoDiagnostic;
use tracing::info;

use crate::{
    config::ChainEntry,
    environment::{DeployEnvironment, DeployOptions, DeploymentResult, VrfCoordinator},
    vrf::VRF_COORDINATOR_MOCK,
};

pub const RANDOM_IPFS_NFT: &str = "RandomIpfsNft";

/// Where the coordinator address and subscription id come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionSource {
    /// A locally deployed coordinator mock; a fresh subscription is created on it
    Development { mock: Address },
    /// Fixed values from the network config
    Configured { coordinator: Address, subscription_id: u64 },
}

impl SubscriptionSource {
    pub fn configured(entry: &ChainEntry, chain_id: u64) -> miette::Result<Self> {
        Ok(SubscriptionSource::Configured {
            coordinator: entry
                .vrf_coordinator(chain_id)
                .into_diagnostic()?,
            subscription_id: entry
                .subscription(chain_id)
                .into_diagnostic()?,
        })
    }

    /// Returns the coordinator address and the subscription id to use.
    pub async fn resolve(
        &self,
        coordinator: &dyn VrfCoordinator,
        from: Address,
    ) -> miette::Result<(Address, u64)> {
        match self {
            SubscriptionSource::Development { mock } => {
                let subscription_id = coordinator
                    .create_subscription(*mock, from)
                    .await?;
                info!("Created subscription {subscription_id} on {mock}");
                Ok((*mock, subscription_id))
            }
            SubscriptionSource::Configured { coordinator, subscription_id } => {
                Ok((*coordinator, *subscription_id))
            }
        }
    }
}

/// Constructor arguments of the randomized NFT
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomIpfsNftArgs {
    pub vrf_coordinator_v2: Address,
    pub subscription_id: u64,
    pub gas_lane: B256,
    pub callback_gas_limit: u32,
    pub mint_fee: U256,
}

impl RandomIpfsNftArgs {
    pub fn new(vrf_coordinator_v2: Address, subscription_id: u64, entry: &ChainEntry) -> Self {
        Self {
            vrf_coordinator_v2,
            subscription_id,
            gas_lane: entry.gas_lane,
            callback_gas_limit: entry.callback_gas_limit,
            mint_fee: entry.mint_fee,
        }
    }

    /// Values in constructor order. Token URIs are not passed.
    pub fn to_values(&self) -> Vec<DynSolValue> {
        vec![
            DynSolValue::Address(self.vrf_coordinator_v2),
            DynSolValue::Uint(U256::from(self.subscription_id), 64),
            DynSolValue::FixedBytes(self.gas_lane, 32),
            DynSolValue::Uint(U256::from(self.callback_gas_limit), 32),
            DynSolValue::Uint(self.mint_fee, 256),
        ]
    }
}

pub async fn subscription_source(env: &DeployEnvironment<'_>) -> miette::Result<SubscriptionSource> {
    if env.context.is_development() {
        let mock = env
            .deployer
            .get_contract_address(VRF_COORDINATOR_MOCK)
            .await?;
        return Ok(SubscriptionSource::Development { mock });
    }
    let chain_id = env.context.chain_id;
    let entry = env
        .config
        .network_config
        .entry(chain_id)
        .into_diagnostic()?;
    SubscriptionSource::configured(entry, chain_id)
}

pub async fn deploy_random_ipfs_nft(
    env: &DeployEnvironment<'_>,
) -> miette::Result<DeploymentResult> {
    let deployer = env.accounts.named_accounts().await?.deployer;
    let chain_id = env.context.chain_id;
    let entry = env
        .config
        .network_config
        .entry(chain_id)
        .into_diagnostic()?;

    let source = subscription_source(env).await?;
    let (vrf_coordinator_v2, subscription_id) = source
        .resolve(env.coordinator, deployer)
        .await?;
    if let (SubscriptionSource::Development { mock }, Some(amount)) =
        (&source, env.config.mocks.fund_amount)
    {
        env.coordinator
            .fund_subscription(*mock, deployer, subscription_id, amount)
            .await?;
    }
    info!("-------------------------------");

    let args = RandomIpfsNftArgs::new(vrf_coordinator_v2, subscription_id, entry).to_values();
    let random_ipfs_nft = env
        .deployer
        .deploy(
            RANDOM_IPFS_NFT,
            DeployOptions {
                from: deployer,
                args: args.clone(),
                log: true,
                wait_confirmations: env.context.block_confirmations,
            },
        )
        .await?;
    info!("{RANDOM_IPFS_NFT} {random_ipfs_nft}");

    if let SubscriptionSource::Development { mock } = source {
        env.coordinator
            .add_consumer(mock, deployer, subscription_id, random_ipfs_nft.address)
            .await?;
    }

    env.verify_if_live(RANDOM_IPFS_NFT, random_ipfs_nft.address, &args)
        .await?;
    info!("-------------------------------");

    Ok(random_ipfs_nft)
}
