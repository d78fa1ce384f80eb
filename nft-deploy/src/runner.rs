use miette::{miette, WrapErr};
use tracing::info;

use crate::{environment::DeployEnvironment, scripts::DeployScript};

pub struct DeployRunner {
    tags: Vec<String>,
}

impl DeployRunner {
    /// Blank tags are ignored. Without any tag every script is selected.
    pub fn new(tags: Vec<String>) -> Self {
        let tags: Vec<String> = tags
            .iter()
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| !tag.is_empty())
            .collect();
        let tags = if tags.is_empty() { vec!["all".to_string()] } else { tags };
        Self { tags }
    }

    pub fn scripts(&self) -> Vec<DeployScript> {
        DeployScript::ALL
            .into_iter()
            .filter(|script| script.matches(&self.tags[..]))
            .collect()
    }

    /// Runs the selected scripts in order, stopping at the first failure.
    pub async fn run(&self, env: &DeployEnvironment<'_>) -> miette::Result<()> {
        let scripts = self.scripts();
        if scripts.is_empty() {
            return Err(miette!("No deploy script matches the tags {:?}", self.tags));
        }
        info!(
            "Running {} deploy scripts on network {} (chain {}) ...",
            scripts.len(),
            env.context.network,
            env.context.chain_id
        );

        for (count, script) in scripts.iter().enumerate() {
            info!("SCRIPT {}: {}", count + 1, script.name());
            script
                .run(env)
                .await
                .wrap_err(format!("Deploy script {} failed", script.name()))?;
        }

        info!("Deployments finished! {} scripts ran.", scripts.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingDeployer, TestBed};

    #[test]
    fn test_defaults_to_all() {
        assert_eq!(DeployRunner::new(vec![]).scripts(), DeployScript::ALL.to_vec());
    }

    #[test]
    fn test_blank_tags_select_all() {
        assert_eq!(DeployRunner::new(vec!["".to_string()]).scripts(), DeployScript::ALL.to_vec());
        assert_eq!(
            DeployRunner::new(vec![" ".to_string(), "".to_string()]).scripts(),
            DeployScript::ALL.to_vec()
        );
    }

    #[test]
    fn test_tags_are_trimmed() {
        assert_eq!(
            DeployRunner::new(vec![" Mocks".to_string(), "basicnft ".to_string()]).scripts(),
            vec![DeployScript::Mocks, DeployScript::BasicNft]
        );
    }

    #[tokio::test]
    async fn test_unknown_tags_fail() {
        let bed = TestBed::new("hardhat", None);

        let err = DeployRunner::new(vec!["nft".to_string()])
            .run(&bed.env())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "No deploy script matches the tags [\"nft\"]");
        assert!(bed.deployer.deployed().is_empty());
    }

    #[tokio::test]
    async fn test_runs_all_scripts_on_development_network() {
        let bed = TestBed::new("hardhat", None);

        DeployRunner::new(vec!["all".to_string()])
            .run(&bed.env())
            .await
            .unwrap();

        assert_eq!(bed.deployer.names(), vec!["VRFCoordinatorV2Mock", "BasicNft", "RandomIpfsNft"]);
    }

    #[tokio::test]
    async fn test_runs_only_tagged_scripts() {
        let bed = TestBed::new("sepolia", None);

        DeployRunner::new(vec!["basicnft".to_string()])
            .run(&bed.env())
            .await
            .unwrap();

        assert_eq!(bed.deployer.names(), vec!["BasicNft"]);
    }

    #[tokio::test]
    async fn test_stops_at_first_failure() {
        let bed = TestBed::new("hardhat", None).with_deployer(RecordingDeployer::failing_on("BasicNft"));

        let err = DeployRunner::new(vec![])
            .run(&bed.env())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Deploy script 01-deploy-basic-nft failed");
        assert_eq!(bed.deployer.names(), vec!["VRFCoordinatorV2Mock"]);
        assert!(bed.coordinator.calls().is_empty());
    }
}
