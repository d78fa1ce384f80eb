use alloy::dyn_abi::DynSolValue;
use tracing::info;

use crate::{
    environment::{DeployEnvironment, DeployOptions},
    vrf::VRF_COORDINATOR_MOCK,
};

/// Deploys the VRF coordinator mock on development networks. Does nothing elsewhere.
pub async fn deploy_mocks(env: &DeployEnvironment<'_>) -> miette::Result<()> {
    if !env.context.is_development() {
        return Ok(());
    }
    let deployer = env.accounts.named_accounts().await?.deployer;
    let mocks = &env.config.mocks;

    info!("Local network detected! Deploying mocks...");
    let mock = env
        .deployer
        .deploy(
            VRF_COORDINATOR_MOCK,
            DeployOptions {
                from: deployer,
                args: vec![
                    DynSolValue::Uint(mocks.base_fee, 96),
                    DynSolValue::Uint(mocks.gas_price_link, 96),
                ],
                log: true,
                wait_confirmations: 1,
            },
        )
        .await?;
    info!("{VRF_COORDINATOR_MOCK} {mock}");
    info!("Mocks Deployed!");
    info!("-----------------------------------");

    Ok(())
}
