//! In-memory collaborators for exercising deploy scripts without a node.

use std::{collections::HashMap, str::FromStr, sync::Mutex};

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{address, Address, B256, U256},
};
use async_trait::async_trait;
use figment::{
    providers::{Format, Yaml},
    Figment,
};
use miette::miette;

use crate::{
    config::DeployConfig,
    context::DeployContext,
    environment::{
        AccountResolver, ContractDeployer, DeployEnvironment, DeployOptions, DeploymentResult,
        NamedAccounts, Verifier, VrfCoordinator,
    },
};

pub const DEPLOYER: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
pub const SEPOLIA_COORDINATOR: Address = address!("0x8103B0A8A00be2DDC778e6e7eaa21791Cd364625");

pub const CONFIG: &str = r#"
development_chains: ["hardhat", "localhost"]
networks:
  hardhat:
    chain_id: 31337
  localhost:
    chain_id: 31337
  sepolia:
    chain_id: 11155111
    block_confirmations: 6
  mainnet:
    chain_id: 1
    block_confirmations: 6
network_config:
  "31337":
    name: localhost
    gas_lane: "0x474e34a077df58807dbe9c96d3c009b23b3c6d0cce433e59bbf5b34f823bc56c"
    callback_gas_limit: 500000
    mint_fee: "10000000000000000"
  "11155111":
    name: sepolia
    vrf_coordinator_v2: "0x8103B0A8A00be2DDC778e6e7eaa21791Cd364625"
    subscription_id: 1002
    gas_lane: "0x474e34a077df58807dbe9c96d3c009b23b3c6d0cce433e59bbf5b34f823bc56c"
    callback_gas_limit: 500000
    mint_fee: "10000000000000000"
mocks:
  fund_amount: "1000000000000000000000"
"#;

pub fn test_config() -> DeployConfig {
    DeployConfig::from_figment(Figment::new().merge(Yaml::string(CONFIG)))
        .expect("Failed to parse test config")
}

pub fn test_context(config: &DeployConfig, network: &str, api_key: Option<&str>) -> DeployContext {
    let settings = config.network(network).unwrap();
    DeployContext::new(
        network,
        settings.chain_id.unwrap(),
        settings,
        &config.development_chains,
        api_key.map(str::to_string),
    )
}

pub struct FixedAccounts;

#[async_trait]
impl AccountResolver for FixedAccounts {
    async fn named_accounts(&self) -> miette::Result<NamedAccounts> {
        Ok(NamedAccounts { deployer: DEPLOYER })
    }
}

/// Hands out sequential addresses and remembers every deployment request
#[derive(Default)]
pub struct RecordingDeployer {
    pub deployments: Mutex<Vec<(String, DeployOptions)>>,
    addresses: Mutex<HashMap<String, Address>>,
    pub fail_on: Option<String>,
}

impl RecordingDeployer {
    pub fn failing_on(contract_name: &str) -> Self {
        Self { fail_on: Some(contract_name.to_string()), ..Default::default() }
    }

    pub fn deployed(&self) -> Vec<(String, DeployOptions)> {
        self.deployments
            .lock()
            .unwrap()
            .clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.deployed()
            .into_iter()
            .map(|(name, _)| name)
            .collect()
    }

    pub fn address_of(&self, contract_name: &str) -> Option<Address> {
        self.addresses
            .lock()
            .unwrap()
            .get(contract_name)
            .copied()
    }
}

#[async_trait]
impl ContractDeployer for RecordingDeployer {
    async fn deploy(
        &self,
        contract_name: &str,
        options: DeployOptions,
    ) -> miette::Result<DeploymentResult> {
        if self.fail_on.as_deref() == Some(contract_name) {
            return Err(miette!("Deployment of {contract_name} reverted"));
        }
        let mut addresses = self.addresses.lock().unwrap();
        let address = Address::with_last_byte(addresses.len() as u8 + 1);
        addresses.insert(contract_name.to_string(), address);
        self.deployments
            .lock()
            .unwrap()
            .push((contract_name.to_string(), options));

        Ok(DeploymentResult {
            address,
            transaction_hash: B256::with_last_byte(addresses.len() as u8),
            block_number: addresses.len() as u64,
            gas_used: 21_000,
            newly_deployed: true,
        })
    }

    async fn get_contract_address(&self, contract_name: &str) -> miette::Result<Address> {
        self.address_of(contract_name)
            .ok_or_else(|| miette!("No deployment found for: {contract_name}"))
    }
}

#[derive(Default)]
pub struct RecordingVerifier {
    pub calls: Mutex<Vec<(String, Address, Vec<DynSolValue>)>>,
}

impl RecordingVerifier {
    pub fn calls(&self) -> Vec<(String, Address, Vec<DynSolValue>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Verifier for RecordingVerifier {
    async fn verify(
        &self,
        contract_name: &str,
        address: Address,
        constructor_args: &[DynSolValue],
    ) -> miette::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((contract_name.to_string(), address, constructor_args.to_vec()));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorCall {
    Create { coordinator: Address },
    Fund { coordinator: Address, subscription_id: u64, amount: U256 },
    AddConsumer { coordinator: Address, subscription_id: u64, consumer: Address },
}

/// Coordinator mock that numbers subscriptions from 1
#[derive(Default)]
pub struct FakeCoordinator {
    pub calls: Mutex<Vec<CoordinatorCall>>,
}

impl FakeCoordinator {
    pub fn calls(&self) -> Vec<CoordinatorCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VrfCoordinator for FakeCoordinator {
    async fn create_subscription(&self, coordinator: Address, _from: Address) -> miette::Result<u64> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(CoordinatorCall::Create { coordinator });
        let created = calls
            .iter()
            .filter(|call| matches!(call, CoordinatorCall::Create { .. }))
            .count();
        Ok(created as u64)
    }

    async fn fund_subscription(
        &self,
        coordinator: Address,
        _from: Address,
        subscription_id: u64,
        amount: U256,
    ) -> miette::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(CoordinatorCall::Fund { coordinator, subscription_id, amount });
        Ok(())
    }

    async fn add_consumer(
        &self,
        coordinator: Address,
        _from: Address,
        subscription_id: u64,
        consumer: Address,
    ) -> miette::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(CoordinatorCall::AddConsumer { coordinator, subscription_id, consumer });
        Ok(())
    }
}

/// Owns a full set of fakes for one network
pub struct TestBed {
    pub config: DeployConfig,
    pub context: DeployContext,
    pub accounts: FixedAccounts,
    pub deployer: RecordingDeployer,
    pub verifier: RecordingVerifier,
    pub coordinator: FakeCoordinator,
}

impl TestBed {
    pub fn new(network: &str, api_key: Option<&str>) -> Self {
        let config = test_config();
        let context = test_context(&config, network, api_key);
        Self {
            config,
            context,
            accounts: FixedAccounts,
            deployer: RecordingDeployer::default(),
            verifier: RecordingVerifier::default(),
            coordinator: FakeCoordinator::default(),
        }
    }

    pub fn with_deployer(mut self, deployer: RecordingDeployer) -> Self {
        self.deployer = deployer;
        self
    }

    pub fn env(&self) -> DeployEnvironment<'_> {
        DeployEnvironment {
            context: &self.context,
            config: &self.config,
            accounts: &self.accounts,
            deployer: &self.deployer,
            verifier: &self.verifier,
            coordinator: &self.coordinator,
        }
    }
}

pub fn mint_fee() -> U256 {
    U256::from_str("10000000000000000").unwrap()
}
