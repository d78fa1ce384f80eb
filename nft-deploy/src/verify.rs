//! Block explorer source verification.
//!
//! Submits the exact compiler input of a contract to an Etherscan compatible API and polls until
//! the explorer has matched it against the deployed bytecode.

use alloy::{dyn_abi::DynSolValue, primitives::Address};
use async_trait::async_trait;
use miette::{miette, IntoDiagnostic, WrapErr};
use serde::Deserialize;
use tokio::time::{sleep, Duration};
use tracing::{debug, info};

use crate::{
    artifacts::ArtifactStore, config::EtherscanSettings, environment::Verifier, rpc::encode_args,
};

/// The two calls of an explorer verification API
#[async_trait]
pub trait VerificationApi: Send + Sync {
    async fn submit(
        &self,
        contract_name: &str,
        address: Address,
        constructor_args: &[DynSolValue],
    ) -> miette::Result<VerificationStatus>;

    async fn check(&self, guid: &str) -> miette::Result<VerificationStatus>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct EtherscanResponse {
    pub status: String,
    pub message: String,
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    /// Submission accepted, carries the GUID to poll with
    Submitted(String),
    Pending,
    Verified,
    AlreadyVerified,
    Failed(String),
}

impl VerificationStatus {
    pub fn from_submission(response: &EtherscanResponse) -> Self {
        if response.status == "1" {
            return VerificationStatus::Submitted(response.result.clone());
        }
        Self::from_failure(response)
    }

    pub fn from_check(response: &EtherscanResponse) -> Self {
        let result = response.result.to_lowercase();
        if result.contains("pending in queue") {
            VerificationStatus::Pending
        } else if result.contains("already verified") {
            VerificationStatus::AlreadyVerified
        } else if response.status == "1" || result.starts_with("pass") {
            VerificationStatus::Verified
        } else {
            VerificationStatus::Failed(response.result.clone())
        }
    }

    fn from_failure(response: &EtherscanResponse) -> Self {
        if response
            .result
            .to_lowercase()
            .contains("already verified")
        {
            VerificationStatus::AlreadyVerified
        } else {
            VerificationStatus::Failed(format!("{}: {}", response.message, response.result))
        }
    }
}

pub struct EtherscanVerifier {
    client: reqwest::Client,
    settings: EtherscanSettings,
    api_key: String,
    chain_id: u64,
    artifacts: ArtifactStore,
}

impl EtherscanVerifier {
    pub fn new(
        settings: EtherscanSettings,
        api_key: String,
        chain_id: u64,
        artifacts: ArtifactStore,
    ) -> Self {
        Self { client: reqwest::Client::new(), settings, api_key, chain_id, artifacts }
    }
}

#[async_trait]
impl VerificationApi for EtherscanVerifier {
    async fn submit(
        &self,
        contract_name: &str,
        address: Address,
        constructor_args: &[DynSolValue],
    ) -> miette::Result<VerificationStatus> {
        let artifact = self.artifacts.load(contract_name)?;
        let build_info = self
            .artifacts
            .build_info(contract_name)
            .wrap_err(format!("Failed to load build info of {contract_name}"))?;
        let source_code = serde_json::to_string(&build_info.input).into_diagnostic()?;

        let form = [
            ("apikey", self.api_key.clone()),
            ("module", "contract".to_string()),
            ("action", "verifysourcecode".to_string()),
            ("contractaddress", format!("{address:#x}")),
            ("sourceCode", source_code),
            ("codeformat", "solidity-standard-json-input".to_string()),
            ("contractname", artifact.qualified_name()),
            ("compilerversion", format!("v{}", build_info.solc_long_version)),
            // Misspelling is part of the API
            ("constructorArguements", hex::encode(encode_args(constructor_args))),
        ];

        let response: EtherscanResponse = self
            .client
            .post(&self.settings.api_url)
            .query(&[("chainid", self.chain_id)])
            .form(&form)
            .send()
            .await
            .into_diagnostic()
            .wrap_err("Failed to submit verification request")?
            .json()
            .await
            .into_diagnostic()
            .wrap_err("Invalid verification response")?;
        debug!("Verification submission response: {:?}", response);

        Ok(VerificationStatus::from_submission(&response))
    }

    async fn check(&self, guid: &str) -> miette::Result<VerificationStatus> {
        let chain_id = self.chain_id.to_string();
        let response: EtherscanResponse = self
            .client
            .get(&self.settings.api_url)
            .query(&[
                ("chainid", chain_id.as_str()),
                ("apikey", self.api_key.as_str()),
                ("module", "contract"),
                ("action", "checkverifystatus"),
                ("guid", guid),
            ])
            .send()
            .await
            .into_diagnostic()
            .wrap_err("Failed to check verification status")?
            .json()
            .await
            .into_diagnostic()
            .wrap_err("Invalid verification status response")?;
        debug!("Verification status response: {:?}", response);

        Ok(VerificationStatus::from_check(&response))
    }
}

/// Submits a contract and checks its status every `poll_interval` until the explorer stops
/// answering Pending, giving up after `max_polls` checks.
pub async fn submit_and_poll(
    api: &dyn VerificationApi,
    poll_interval: Duration,
    max_polls: u32,
    contract_name: &str,
    address: Address,
    constructor_args: &[DynSolValue],
) -> miette::Result<()> {
    info!("Verifying {contract_name} at {address}...");
    let guid = match api
        .submit(contract_name, address, constructor_args)
        .await?
    {
        VerificationStatus::Submitted(guid) => guid,
        VerificationStatus::AlreadyVerified => {
            info!("Already Verified!");
            return Ok(());
        }
        VerificationStatus::Failed(reason) => {
            return Err(miette!("Verification of {contract_name} rejected: {reason}"))
        }
        status => return Err(miette!("Unexpected verification status {status:?}")),
    };

    for _ in 0..max_polls {
        sleep(poll_interval).await;
        match api.check(&guid).await? {
            VerificationStatus::Pending => debug!("Verification of {contract_name} pending"),
            VerificationStatus::Verified => {
                info!("Successfully verified {contract_name} at {address}");
                return Ok(());
            }
            VerificationStatus::AlreadyVerified => {
                info!("Already Verified!");
                return Ok(());
            }
            VerificationStatus::Failed(reason) => {
                return Err(miette!("Verification of {contract_name} failed: {reason}"))
            }
            VerificationStatus::Submitted(_) => {}
        }
    }

    Err(miette!(
        "Verification of {contract_name} still pending after {max_polls} checks (guid {guid})"
    ))
}

#[async_trait]
impl Verifier for EtherscanVerifier {
    async fn verify(
        &self,
        contract_name: &str,
        address: Address,
        constructor_args: &[DynSolValue],
    ) -> miette::Result<()> {
        submit_and_poll(
            self,
            Duration::from_secs(self.settings.poll_interval_secs),
            self.settings.max_polls,
            contract_name,
            address,
            constructor_args,
        )
        .await
    }
}
