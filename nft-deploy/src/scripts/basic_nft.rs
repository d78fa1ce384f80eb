use tracing::info;

use crate::environment::{DeployEnvironment, DeployOptions, DeploymentResult};

pub const BASIC_NFT: &str = "BasicNft";

pub async fn deploy_basic_nft(env: &DeployEnvironment<'_>) -> miette::Result<DeploymentResult> {
    let deployer = env.accounts.named_accounts().await?.deployer;

    info!("-----------------------------------");
    let args = Vec::new();
    let basic_nft = env
        .deployer
        .deploy(
            BASIC_NFT,
            DeployOptions {
                from: deployer,
                args: args.clone(),
                log: true,
                wait_confirmations: env.context.block_confirmations,
            },
        )
        .await?;
    info!("{BASIC_NFT} {basic_nft}");

    env.verify_if_live(BASIC_NFT, basic_nft.address, &args)
        .await?;
    info!("-----------------------------------");

    Ok(basic_nft)
}
