//! Compiled contract artifacts.
//!
//! Reads Hardhat-style artifact files (`<Name>.sol/<Name>.json` with a
//! `bytecode` field) and indexes their creation bytecode by contract name.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::types::decode_hex;

#[derive(Debug, Deserialize)]
struct HardhatArtifact {
    #[serde(rename = "contractName")]
    contract_name: String,
    bytecode: String,
}

/// Creation bytecode keyed by contract name.
#[derive(Debug, Clone, Default)]
pub struct ArtifactStore {
    bytecode: HashMap<String, Vec<u8>>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every artifact below `dir`.
    ///
    /// `build-info/` and `*.dbg.json` files are skipped. Artifacts with empty
    /// bytecode (interfaces, abstract contracts) are not indexed.
    pub fn load_dir(dir: &Path) -> anyhow::Result<Self> {
        let mut store = Self::new();
        store.load_recursive(dir)?;
        tracing::debug!(dir = %dir.display(), count = store.len(), "loaded artifacts");
        Ok(store)
    }

    fn load_recursive(&mut self, dir: &Path) -> anyhow::Result<()> {
        let entries = fs::read_dir(dir)
            .with_context(|| format!("Failed to read artifacts directory: {}", dir.display()))?;

        let mut sorted: Vec<_> = entries
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to read directory entries: {}", dir.display()))?;
        sorted.sort_by_key(|e| e.file_name());

        for entry in sorted {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            let ty = entry
                .file_type()
                .with_context(|| format!("Failed to stat file: {}", path.display()))?;

            if ty.is_dir() {
                if name != "build-info" {
                    self.load_recursive(&path)?;
                }
            } else if name.ends_with(".json") && !name.ends_with(".dbg.json") {
                let content = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read artifact: {}", path.display()))?;
                let artifact: HardhatArtifact = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse artifact: {}", path.display()))?;
                let code = decode_hex(&artifact.bytecode)
                    .with_context(|| format!("Invalid bytecode in {}", path.display()))?;
                if !code.is_empty() {
                    self.bytecode.insert(artifact.contract_name, code);
                }
            }
        }
        Ok(())
    }

    pub fn insert(&mut self, contract: impl Into<String>, bytecode: Vec<u8>) {
        self.bytecode.insert(contract.into(), bytecode);
    }

    pub fn with(mut self, contract: impl Into<String>, bytecode: Vec<u8>) -> Self {
        self.insert(contract, bytecode);
        self
    }

    pub fn bytecode(&self, contract: &str) -> Option<&[u8]> {
        self.bytecode.get(contract).map(Vec::as_slice)
    }

    pub fn contains(&self, contract: &str) -> bool {
        self.bytecode.contains_key(contract)
    }

    pub fn len(&self) -> usize {
        self.bytecode.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytecode.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_artifact(root: &Path, name: &str, bytecode: &str) {
        let dir = root.join("contracts").join(format!("{name}.sol"));
        fs::create_dir_all(&dir).unwrap();
        let json = serde_json::json!({
            "contractName": name,
            "abi": [],
            "bytecode": bytecode,
        });
        fs::write(dir.join(format!("{name}.json")), json.to_string()).unwrap();
        fs::write(dir.join(format!("{name}.dbg.json")), "{\"buildInfo\": \"x\"}").unwrap();
    }

    #[test]
    fn test_load_dir_indexes_by_contract_name() {
        let tmp = TempDir::new().unwrap();
        write_artifact(tmp.path(), "GasPool", "0x6080");
        write_artifact(tmp.path(), "IBabelCore", "0x");
        fs::create_dir_all(tmp.path().join("build-info")).unwrap();
        fs::write(tmp.path().join("build-info").join("abc.json"), "{}").unwrap();

        let store = ArtifactStore::load_dir(tmp.path()).unwrap();
        assert_eq!(store.bytecode("GasPool"), Some(&[0x60, 0x80][..]));
        assert!(!store.contains("IBabelCore"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_load_dir_reports_bad_bytecode() {
        let tmp = TempDir::new().unwrap();
        write_artifact(tmp.path(), "Broken", "6080");
        let err = ArtifactStore::load_dir(tmp.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid bytecode"));
    }
}
