//! Compiled contract artifacts.
//!
//! Reads the artifact layout produced by the Solidity toolchain:
//! `<root>/<sourceName>/<Contract>.json` holds the ABI and creation bytecode, the sibling
//! `<Contract>.dbg.json` points at the build-info file that carries the exact compiler input.

use std::path::{Path, PathBuf};

use alloy::{json_abi::JsonAbi, primitives::Bytes};
use glob::glob;
use miette::{miette, IntoDiagnostic, WrapErr};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub contract_name: String,
    pub source_name: String,
    pub abi: JsonAbi,
    pub bytecode: Bytes,
}

impl Artifact {
    /// Fully qualified name as expected by block explorers
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }
}

#[derive(Debug, Deserialize)]
struct DebugFile {
    #[serde(rename = "buildInfo")]
    build_info: PathBuf,
}

/// Compiler version and standard-JSON input a contract was built with
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub solc_long_version: String,
    pub input: Value,
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Finds the artifact file of a contract by name anywhere below the artifacts root.
    pub fn find(&self, contract_name: &str) -> miette::Result<PathBuf> {
        let pattern = self
            .root
            .join("**")
            .join(format!("{contract_name}.json"));
        let pattern = pattern
            .to_str()
            .ok_or_else(|| miette!("Artifacts path is not valid UTF-8"))?;

        let mut matches = glob(pattern)
            .into_diagnostic()
            .wrap_err("Invalid artifacts path")?
            .filter_map(Result::ok)
            .filter(|path| !path.components().any(|c| c.as_os_str() == "build-info"))
            .collect::<Vec<_>>();

        match matches.len() {
            0 => Err(miette!(
                "Artifact for contract {contract_name} not found in {}. Compile the contracts first.",
                self.root.display()
            )),
            1 => Ok(matches.remove(0)),
            _ => Err(miette!(
                "Found {} artifacts named {contract_name}: {:?}",
                matches.len(),
                matches
            )),
        }
    }

    pub fn load(&self, contract_name: &str) -> miette::Result<Artifact> {
        let path = self.find(contract_name)?;
        read_json(&path)
    }

    pub fn build_info(&self, contract_name: &str) -> miette::Result<BuildInfo> {
        let artifact_path = self.find(contract_name)?;
        let debug_path = artifact_path.with_extension("dbg.json");
        let debug: DebugFile = read_json(&debug_path)?;

        // The build-info path is relative to the debug file
        let build_info_path = debug_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(&debug.build_info);
        read_json(&build_info_path)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> miette::Result<T> {
    let content = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err(format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .into_diagnostic()
        .wrap_err(format!("Failed to parse {}", path.display()))
}
