use std::path::{Path, PathBuf};

use alloy_primitives::hex;
use chainplan_core::ContractType;
use serde_json::Value;

use crate::{EvmError, Result};

// ─── ArtifactStore ────────────────────────────────────────────────────────

/// Reads creation bytecode from compiled artifacts.
///
/// Looks for `<dir>/<Contract>.json` and accepts the common layouts:
/// `"bytecode": "0x…"` (Truffle, Hardhat) and `"bytecode": { "object": "…" }`
/// (Foundry).
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, contract: &ContractType) -> PathBuf {
        self.dir.join(format!("{}.json", contract.as_str()))
    }

    pub fn bytecode(&self, contract: &ContractType) -> Result<Vec<u8>> {
        let err = |reason: String| EvmError::Artifact {
            contract: contract.to_string(),
            reason,
        };

        let path = self.path(contract);
        let data = std::fs::read_to_string(&path)
            .map_err(|e| err(format!("cannot read {}: {e}", path.display())))?;
        let json: Value = serde_json::from_str(&data)?;

        let raw = match json.get("bytecode") {
            Some(Value::String(s)) => s.as_str(),
            Some(Value::Object(o)) => o
                .get("object")
                .and_then(Value::as_str)
                .ok_or_else(|| err("bytecode.object is missing".into()))?,
            _ => return Err(err("no bytecode field".into())),
        };

        // `__Name___…` placeholders mark libraries that still need linking
        if raw.contains("__") {
            return Err(err("bytecode has unlinked library placeholders".into()));
        }
        let code = hex::decode(raw).map_err(|e| err(format!("bytecode is not hex: {e}")))?;
        if code.is_empty() {
            return Err(err("bytecode is empty (abstract contract or interface?)".into()));
        }
        Ok(code)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with(name: &str, body: &str) -> (TempDir, ArtifactStore) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(format!("{name}.json")), body).unwrap();
        let store = ArtifactStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn reads_truffle_layout() {
        let (_dir, store) = store_with(
            "VaultController",
            r#"{"contractName":"VaultController","abi":[],"bytecode":"0x6080604052"}"#,
        );
        let code = store
            .bytecode(&ContractType::new("VaultController"))
            .unwrap();
        assert_eq!(code, vec![0x60, 0x80, 0x60, 0x40, 0x52]);
    }

    #[test]
    fn reads_foundry_layout() {
        let (_dir, store) = store_with("Vault", r#"{"bytecode":{"object":"0x6001"}}"#);
        assert_eq!(
            store.bytecode(&ContractType::new("Vault")).unwrap(),
            vec![0x60, 0x01]
        );
    }

    #[test]
    fn missing_artifact_names_the_contract() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let err = store
            .bytecode(&ContractType::new("VaultManager"))
            .unwrap_err();
        assert!(err.to_string().contains("VaultManager"), "{err}");
    }

    #[test]
    fn empty_and_unlinked_bytecode_rejected() {
        let (_dir, store) = store_with("IVault", r#"{"bytecode":"0x"}"#);
        assert!(store.bytecode(&ContractType::new("IVault")).is_err());

        let (_dir, store) = store_with("Lib", r#"{"bytecode":"0x60__SafeMath______60"}"#);
        let err = store.bytecode(&ContractType::new("Lib")).unwrap_err();
        assert!(err.to_string().contains("unlinked"), "{err}");
    }
}
