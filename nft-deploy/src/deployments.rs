use std::{
    fs,
    path::{Path, PathBuf},
};

use alloy::{
    json_abi::JsonAbi,
    primitives::{keccak256, Address, Bytes, B256},
};
use miette::{miette, IntoDiagnostic, WrapErr};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A contract deployment saved to disk, one file per contract and network
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub address: Address,
    pub abi: JsonAbi,
    pub transaction_hash: B256,
    pub block_number: u64,
    pub gas_used: u64,
    /// ABI encoded constructor arguments
    pub args: Bytes,
    pub bytecode_hash: B256,
    /// Hash of the runtime code found at `address` right after deployment
    #[serde(default)]
    pub code_hash: Option<B256>,
}

impl DeploymentRecord {
    /// Whether the record was produced from the same creation code and constructor arguments.
    pub fn matches(&self, bytecode: &[u8], args: &[u8]) -> bool {
        self.bytecode_hash == keccak256(bytecode) && self.args.as_ref() == args
    }

    /// Whether `code`, read from the recorded address, is still the code deployed there.
    ///
    /// Records without a code hash never count as live.
    pub fn is_live(&self, code: &[u8]) -> bool {
        !code.is_empty() && self.code_hash == Some(keccak256(code))
    }
}

/// Deployments of a single network, stored under `<root>/<network>/`
#[derive(Debug, Clone)]
pub struct DeploymentStore {
    dir: PathBuf,
}

impl DeploymentStore {
    /// Opens the store of a network and records the chain id it belongs to.
    pub fn open(root: &Path, network: &str, chain_id: u64) -> miette::Result<Self> {
        let dir = root.join(network);
        fs::create_dir_all(&dir)
            .into_diagnostic()
            .wrap_err(format!("Failed to create {}", dir.display()))?;

        let chain_id_path = dir.join(".chainId");
        if let Ok(previous) = fs::read_to_string(&chain_id_path) {
            if previous.trim() != chain_id.to_string() {
                warn!(
                    "Deployments in {} were made on chain {}, now on chain {chain_id}",
                    dir.display(),
                    previous.trim()
                );
            }
        }
        fs::write(&chain_id_path, chain_id.to_string())
            .into_diagnostic()
            .wrap_err("Failed to write .chainId")?;

        Ok(Self { dir })
    }

    fn path(&self, contract_name: &str) -> PathBuf {
        self.dir
            .join(format!("{contract_name}.json"))
    }

    pub fn save(&self, contract_name: &str, record: &DeploymentRecord) -> miette::Result<()> {
        let path = self.path(contract_name);
        let json = serde_json::to_string_pretty(record).into_diagnostic()?;
        fs::write(&path, json)
            .into_diagnostic()
            .wrap_err(format!("Failed to write {}", path.display()))
    }

    pub fn load(&self, contract_name: &str) -> miette::Result<Option<DeploymentRecord>> {
        let path = self.path(contract_name);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .into_diagnostic()
            .wrap_err(format!("Failed to read {}", path.display()))?;
        let record = serde_json::from_str(&content)
            .into_diagnostic()
            .wrap_err(format!("Failed to parse {}", path.display()))?;
        Ok(Some(record))
    }

    pub fn get(&self, contract_name: &str) -> miette::Result<DeploymentRecord> {
        self.load(contract_name)?
            .ok_or_else(|| miette!("No deployment found for: {contract_name}"))
    }
}
