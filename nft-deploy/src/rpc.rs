use std::str::FromStr;

use alloy::{
    dyn_abi::DynSolValue,
    network::{EthereumWallet, TransactionBuilder},
    primitives::{keccak256, Address, Bytes},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    transports::http::reqwest::Url,
};
use async_trait::async_trait;
use miette::{miette, IntoDiagnostic, WrapErr};
use tracing::{debug, info};

use crate::{
    artifacts::ArtifactStore,
    deployments::{DeploymentRecord, DeploymentStore},
    environment::{
        AccountResolver, ContractDeployer, DeployOptions, DeploymentResult, NamedAccounts,
    },
};

pub struct RPCProvider {
    provider: DynProvider,
    signers: Vec<Address>,
}

impl RPCProvider {
    /// Connects to a node. Without a private key, transactions are signed by the node's unlocked
    /// accounts.
    pub fn new(url: &str, private_key: Option<&str>) -> miette::Result<Self> {
        let url: Url = url
            .parse()
            .into_diagnostic()
            .wrap_err(format!("Invalid RPC URL '{url}'"))?;

        match private_key {
            Some(key) => {
                let signer = PrivateKeySigner::from_str(key.trim())
                    .into_diagnostic()
                    .wrap_err("Invalid private key")?;
                let signers = vec![signer.address()];
                let provider = ProviderBuilder::new()
                    .wallet(EthereumWallet::from(signer))
                    .on_http(url)
                    .erased();
                Ok(Self { provider, signers })
            }
            None => {
                let provider = ProviderBuilder::new()
                    .on_http(url)
                    .erased();
                Ok(Self { provider, signers: Vec::new() })
            }
        }
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    pub async fn chain_id(&self) -> miette::Result<u64> {
        self.provider
            .get_chain_id()
            .await
            .into_diagnostic()
            .wrap_err("Failed to fetch chain id")
    }

    /// Accounts able to sign: the configured keys, or the node's unlocked accounts.
    pub async fn accounts(&self) -> miette::Result<Vec<Address>> {
        if !self.signers.is_empty() {
            return Ok(self.signers.clone());
        }
        self.provider
            .get_accounts()
            .await
            .into_diagnostic()
            .wrap_err("Failed to fetch node accounts")
    }
}

/// Resolves named accounts to account indexes of the provider
pub struct IndexedAccounts<'a> {
    rpc: &'a RPCProvider,
    deployer_index: usize,
}

impl<'a> IndexedAccounts<'a> {
    pub fn new(rpc: &'a RPCProvider, deployer_index: usize) -> Self {
        Self { rpc, deployer_index }
    }
}

#[async_trait]
impl AccountResolver for IndexedAccounts<'_> {
    async fn named_accounts(&self) -> miette::Result<NamedAccounts> {
        let accounts = self.rpc.accounts().await?;
        let deployer = accounts
            .get(self.deployer_index)
            .copied()
            .ok_or_else(|| {
                miette!(
                    "Deployer account #{} not available, only {} accounts found",
                    self.deployer_index,
                    accounts.len()
                )
            })?;
        Ok(NamedAccounts { deployer })
    }
}

/// Deploys compiled artifacts through a node and records them in the deployment store
pub struct RpcDeployer<'a> {
    rpc: &'a RPCProvider,
    artifacts: ArtifactStore,
    store: DeploymentStore,
}

impl<'a> RpcDeployer<'a> {
    pub fn new(rpc: &'a RPCProvider, artifacts: ArtifactStore, store: DeploymentStore) -> Self {
        Self { rpc, artifacts, store }
    }
}

/// Reads deployed runtime code
#[async_trait]
pub trait CodeReader: Send + Sync {
    async fn code_at(&self, address: Address) -> miette::Result<Bytes>;
}

#[async_trait]
impl CodeReader for RPCProvider {
    async fn code_at(&self, address: Address) -> miette::Result<Bytes> {
        self.provider
            .get_code_at(address)
            .await
            .into_diagnostic()
            .wrap_err(format!("Failed to fetch code at {address}"))
    }
}

/// Returns the saved deployment when it was made from the same creation code and args and its
/// runtime code is still the one at the recorded address.
pub async fn find_reusable(
    store: &DeploymentStore,
    chain: &dyn CodeReader,
    contract_name: &str,
    bytecode: &[u8],
    encoded_args: &[u8],
) -> miette::Result<Option<DeploymentResult>> {
    let Some(record) = store.load(contract_name)? else {
        return Ok(None);
    };
    if !record.matches(bytecode, encoded_args) {
        debug!("Saved deployment of {contract_name} differs, deploying again");
        return Ok(None);
    }
    let code = chain.code_at(record.address).await?;
    if !record.is_live(&code) {
        debug!("Code at {} is not the saved {contract_name}, deploying again", record.address);
        return Ok(None);
    }
    Ok(Some(DeploymentResult {
        address: record.address,
        transaction_hash: record.transaction_hash,
        block_number: record.block_number,
        gas_used: record.gas_used,
        newly_deployed: false,
    }))
}

pub fn encode_args(args: &[DynSolValue]) -> Bytes {
    if args.is_empty() {
        return Bytes::new();
    }
    DynSolValue::Tuple(args.to_vec())
        .abi_encode_params()
        .into()
}

#[async_trait]
impl ContractDeployer for RpcDeployer<'_> {
    async fn deploy(
        &self,
        contract_name: &str,
        options: DeployOptions,
    ) -> miette::Result<DeploymentResult> {
        let artifact = self.artifacts.load(contract_name)?;
        let encoded_args = encode_args(&options.args);

        if let Some(existing) = find_reusable(
            &self.store,
            self.rpc,
            contract_name,
            &artifact.bytecode,
            &encoded_args,
        )
        .await?
        {
            if options.log {
                info!("reusing \"{contract_name}\" at {}", existing.address);
            }
            return Ok(existing);
        }

        let mut init_code = artifact.bytecode.to_vec();
        init_code.extend_from_slice(&encoded_args);

        let tx = TransactionRequest::default()
            .from(options.from)
            .with_deploy_code(init_code);

        let pending = self
            .rpc
            .provider()
            .send_transaction(tx)
            .await
            .into_diagnostic()
            .wrap_err(format!("Failed to send deployment of {contract_name}"))?;
        let tx_hash = *pending.tx_hash();
        if options.log {
            info!("deploying \"{contract_name}\" (tx: {tx_hash})...");
        }

        let receipt = pending
            .with_required_confirmations(options.wait_confirmations)
            .get_receipt()
            .await
            .into_diagnostic()
            .wrap_err(format!("Failed to get receipt of {contract_name} deployment"))?;

        if !receipt.status() {
            return Err(miette!("Deployment of {contract_name} reverted (tx: {tx_hash})"));
        }
        let address = receipt
            .contract_address
            .ok_or_else(|| miette!("Receipt of {contract_name} has no contract address"))?;
        let block_number = receipt.block_number.unwrap_or_default();
        let gas_used = receipt.gas_used as u64;

        if options.log {
            info!("deployed \"{contract_name}\" at {address} with {gas_used} gas");
        }
        let code = self.rpc.code_at(address).await?;

        self.store.save(
            contract_name,
            &DeploymentRecord {
                address,
                abi: artifact.abi,
                transaction_hash: tx_hash,
                block_number,
                gas_used,
                args: encoded_args,
                bytecode_hash: keccak256(&artifact.bytecode),
                code_hash: Some(keccak256(&code)),
            },
        )?;

        Ok(DeploymentResult {
            address,
            transaction_hash: tx_hash,
            block_number,
            gas_used,
            newly_deployed: true,
        })
    }

    async fn get_contract_address(&self, contract_name: &str) -> miette::Result<Address> {
        Ok(self.store.get(contract_name)?.address)
    }
}
