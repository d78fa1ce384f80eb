pub mod basic_nft;
pub mod mocks;
pub mod random_ipfs_nft;

use crate::environment::DeployEnvironment;

/// Deploy scripts in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployScript {
    Mocks,
    BasicNft,
    RandomIpfsNft,
}

impl DeployScript {
    pub const ALL: [DeployScript; 3] =
        [DeployScript::Mocks, DeployScript::BasicNft, DeployScript::RandomIpfsNft];

    pub fn name(&self) -> &'static str {
        match self {
            DeployScript::Mocks => "00-deploy-mocks",
            DeployScript::BasicNft => "01-deploy-basic-nft",
            DeployScript::RandomIpfsNft => "02-deploy-random-ipfs-nft",
        }
    }

    pub fn tags(&self) -> &'static [&'static str] {
        match self {
            DeployScript::Mocks => &["all", "mocks"],
            DeployScript::BasicNft => &["all", "basicnft", "main"],
            DeployScript::RandomIpfsNft => &["all", "randomipfs", "main"],
        }
    }

    pub fn matches<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        tags.iter()
            .any(|tag| self.tags().contains(&tag.as_ref()))
    }

    pub async fn run(&self, env: &DeployEnvironment<'_>) -> miette::Result<()> {
        match self {
            DeployScript::Mocks => mocks::deploy_mocks(env).await,
            DeployScript::BasicNft => basic_nft::deploy_basic_nft(env)
                .await
                .map(|_| ()),
            DeployScript::RandomIpfsNft => random_ipfs_nft::deploy_random_ipfs_nft(env)
                .await
                .map(|_| ()),
        }
    }
}
