//! Collaborators the deploy scripts talk to.
//!
//! Every external system sits behind a trait so scripts can run against a live node or against
//! in-memory fakes.

use std::fmt;

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, B256, U256},
};
use async_trait::async_trait;

use crate::{config::DeployConfig, context::DeployContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedAccounts {
    pub deployer: Address,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeployOptions {
    pub from: Address,
    pub args: Vec<DynSolValue>,
    pub log: bool,
    pub wait_confirmations: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentResult {
    pub address: Address,
    pub transaction_hash: B256,
    pub block_number: u64,
    pub gas_used: u64,
    /// False when an identical deployment was already live and got reused
    pub newly_deployed: bool,
}

impl fmt::Display for DeploymentResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.newly_deployed { "deployed" } else { "reused" };
        write!(
            f,
            "{state} at {} (tx: {}, block {}, {} gas)",
            self.address, self.transaction_hash, self.block_number, self.gas_used
        )
    }
}

#[async_trait]
pub trait AccountResolver: Send + Sync {
    async fn named_accounts(&self) -> miette::Result<NamedAccounts>;
}

#[async_trait]
pub trait ContractDeployer: Send + Sync {
    /// Submits the creation transaction of a contract and waits for confirmations.
    async fn deploy(
        &self,
        contract_name: &str,
        options: DeployOptions,
    ) -> miette::Result<DeploymentResult>;

    /// Address of a contract previously deployed on the active network.
    async fn get_contract_address(&self, contract_name: &str) -> miette::Result<Address>;
}

#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(
        &self,
        contract_name: &str,
        address: Address,
        constructor_args: &[DynSolValue],
    ) -> miette::Result<()>;
}

#[async_trait]
pub trait VrfCoordinator: Send + Sync {
    /// Creates a subscription and returns the id from the first event of the receipt.
    async fn create_subscription(&self, coordinator: Address, from: Address)
        -> miette::Result<u64>;

    async fn fund_subscription(
        &self,
        coordinator: Address,
        from: Address,
        subscription_id: u64,
        amount: U256,
    ) -> miette::Result<()>;

    async fn add_consumer(
        &self,
        coordinator: Address,
        from: Address,
        subscription_id: u64,
        consumer: Address,
    ) -> miette::Result<()>;
}

/// What a deploy script runs against
pub struct DeployEnvironment<'a> {
    pub context: &'a DeployContext,
    pub config: &'a DeployConfig,
    pub accounts: &'a dyn AccountResolver,
    pub deployer: &'a dyn ContractDeployer,
    pub verifier: &'a dyn Verifier,
    pub coordinator: &'a dyn VrfCoordinator,
}

impl DeployEnvironment<'_> {
    /// Verifies a deployed contract when the network and credentials allow it.
    ///
    /// Returns whether verification was attempted.
    pub async fn verify_if_live(
        &self,
        contract_name: &str,
        address: Address,
        constructor_args: &[DynSolValue],
    ) -> miette::Result<bool> {
        if !self.context.should_verify() {
            return Ok(false);
        }
        tracing::info!("Verifying...");
        self.verifier
            .verify(contract_name, address, constructor_args)
            .await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;

    #[test]
    fn test_display_deployment_result() {
        let result = DeploymentResult {
            address: address!("0x5FbDB2315678afecb367f032d93F642f64180aa3"),
            transaction_hash: B256::with_last_byte(1),
            block_number: 3,
            gas_used: 21_000,
            newly_deployed: false,
        };

        assert_eq!(
            result.to_string(),
            format!(
                "reused at 0x5FbDB2315678afecb367f032d93F642f64180aa3 (tx: {}, block 3, 21000 gas)",
                B256::with_last_byte(1)
            )
        );
    }
}
