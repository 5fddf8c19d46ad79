//! Persisted deployment progress.
//!
//! A `DeploymentRecord` is the only state that survives between runs. The
//! orchestrator saves it after every unit and every wiring step, before it
//! moves on, so a crash can at worst lose the outcome of the one in-flight
//! external call.

use crate::error::{ChainplanError, Result};
use crate::paths;
use crate::types::ContractType;
use alloy_primitives::{Address, B256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Pending,
    Deployed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Applied,
    Failed,
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Deployed => "deployed",
            Self::Failed => "failed",
        })
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Applied => "applied",
            Self::Failed => "failed",
        })
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitEntry {
    pub contract: ContractType,
    pub status: UnitStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<B256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEntry {
    pub label: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<B256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// DeploymentRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    #[serde(default = "default_version")]
    pub version: u32,
    pub network: String,
    #[serde(default)]
    pub units: BTreeMap<String, UnitEntry>,
    /// Indexed like the plan's wiring steps.
    #[serde(default)]
    pub steps: Vec<StepEntry>,
    /// Position of the last completed step over units (in plan order)
    /// followed by wiring steps. `None` until something succeeds.
    ///
    /// For units A, B and one wiring step, a fully applied record has
    /// `Some(2)`: A is 0, B is 1, the wiring step is 2.
    #[serde(default)]
    pub last_completed_step: Option<usize>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_version() -> u32 {
    1
}

impl DeploymentRecord {
    pub fn new(network: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            version: default_version(),
            network: network.into(),
            units: BTreeMap::new(),
            steps: Vec::new(),
            last_completed_step: None,
            created_at: now,
            updated_at: now,
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn unit_status(&self, name: &str) -> UnitStatus {
        self.units
            .get(name)
            .map(|e| e.status)
            .unwrap_or(UnitStatus::Pending)
    }

    pub fn step_status(&self, index: usize) -> StepStatus {
        self.steps
            .get(index)
            .map(|e| e.status)
            .unwrap_or(StepStatus::Pending)
    }

    /// The recorded address of a unit, only once it is `Deployed`.
    pub fn address_of(&self, name: &str) -> Option<Address> {
        self.units
            .get(name)
            .filter(|e| e.status == UnitStatus::Deployed)
            .and_then(|e| e.address)
    }

    /// Names of failed units and labels of failed steps, in record order.
    pub fn failures(&self) -> Vec<String> {
        let units = self
            .units
            .iter()
            .filter(|(_, e)| e.status == UnitStatus::Failed)
            .map(|(name, _)| name.clone());
        let steps = self
            .steps
            .iter()
            .filter(|e| e.status == StepStatus::Failed)
            .map(|e| e.label.clone());
        units.chain(steps).collect()
    }

    pub fn has_failures(&self) -> bool {
        self.units.values().any(|e| e.status == UnitStatus::Failed)
            || self.steps.iter().any(|e| e.status == StepStatus::Failed)
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    pub fn mark_deployed(
        &mut self,
        name: &str,
        contract: &ContractType,
        address: Address,
        tx_hash: Option<B256>,
        position: usize,
    ) {
        let now = Utc::now();
        self.units.insert(
            name.to_string(),
            UnitEntry {
                contract: contract.clone(),
                status: UnitStatus::Deployed,
                address: Some(address),
                tx_hash,
                error: None,
                updated_at: now,
            },
        );
        self.last_completed_step = Some(position);
        self.updated_at = now;
    }

    pub fn mark_unit_failed(&mut self, name: &str, contract: &ContractType, error: String) {
        let now = Utc::now();
        self.units.insert(
            name.to_string(),
            UnitEntry {
                contract: contract.clone(),
                status: UnitStatus::Failed,
                address: None,
                tx_hash: None,
                error: Some(error),
                updated_at: now,
            },
        );
        self.updated_at = now;
    }

    pub fn mark_applied(
        &mut self,
        index: usize,
        label: String,
        tx_hash: Option<B256>,
        position: usize,
    ) {
        let now = Utc::now();
        self.put_step(
            index,
            StepEntry {
                label,
                status: StepStatus::Applied,
                tx_hash,
                error: None,
                updated_at: now,
            },
        );
        self.last_completed_step = Some(position);
        self.updated_at = now;
    }

    pub fn mark_step_failed(&mut self, index: usize, label: String, error: String) {
        let now = Utc::now();
        self.put_step(
            index,
            StepEntry {
                label,
                status: StepStatus::Failed,
                tx_hash: None,
                error: Some(error),
                updated_at: now,
            },
        );
        self.updated_at = now;
    }

    /// Steps run strictly in order, so `index` is at most one past the end.
    fn put_step(&mut self, index: usize, entry: StepEntry) {
        if let Some(slot) = self.steps.get_mut(index) {
            *slot = entry;
        } else {
            debug_assert_eq!(index, self.steps.len(), "wiring steps recorded out of order");
            self.steps.push(entry);
        }
    }
}

// ---------------------------------------------------------------------------
// RecordStore
// ---------------------------------------------------------------------------

/// Durable home of a record. `save` must be atomic: after a crash the store
/// holds either the previous or the new record, never a mix.
pub trait RecordStore {
    fn load(&self) -> Result<Option<DeploymentRecord>>;
    fn save(&mut self, record: &DeploymentRecord) -> Result<()>;
}

impl<S: RecordStore> RecordStore for &mut S {
    fn load(&self) -> Result<Option<DeploymentRecord>> {
        (**self).load()
    }

    fn save(&mut self, record: &DeploymentRecord) -> Result<()> {
        (**self).save(record)
    }
}

/// YAML file under `.chainplan/records/<network>.yaml`.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    path: PathBuf,
}

impl FileRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_network(root: &Path, network: &str) -> Self {
        Self::new(paths::record_path(root, network))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordStore for FileRecordStore {
    fn load(&self) -> Result<Option<DeploymentRecord>> {
        crate::io::read_yaml(&self.path)
    }

    fn save(&mut self, record: &DeploymentRecord) -> Result<()> {
        crate::io::write_yaml(&self.path, record)
    }
}

/// Keeps every saved snapshot in memory. Useful for rehearsals and tests
/// that need to inspect what was persisted and when.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    pub saves: Vec<DeploymentRecord>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&DeploymentRecord> {
        self.saves.last()
    }
}

impl RecordStore for MemoryRecordStore {
    fn load(&self) -> Result<Option<DeploymentRecord>> {
        Ok(self.saves.last().cloned())
    }

    fn save(&mut self, record: &DeploymentRecord) -> Result<()> {
        self.saves.push(record.clone());
        Ok(())
    }
}

/// Load the record for `network`, or start an empty one.
///
/// Refuses a record written for a different network, which would otherwise
/// make the orchestrator skip units that were never deployed here.
pub fn load_or_new(store: &impl RecordStore, network: &str) -> Result<DeploymentRecord> {
    match store.load()? {
        Some(record) if record.network != network => Err(ChainplanError::NetworkMismatch {
            expected: network.to_string(),
            found: record.network,
        }),
        Some(record) => Ok(record),
        None => Ok(DeploymentRecord::new(network)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use tempfile::TempDir;

    const ADDR: Address = address!("5fbdb2315678afecb367f032d93f642f64180aa3");

    #[test]
    fn fresh_record_is_all_pending() {
        let record = DeploymentRecord::new("local");
        assert_eq!(record.unit_status("anything"), UnitStatus::Pending);
        assert_eq!(record.step_status(0), StepStatus::Pending);
        assert_eq!(record.last_completed_step, None);
        assert!(!record.has_failures());
    }

    #[test]
    fn failed_unit_has_no_address() {
        let mut record = DeploymentRecord::new("local");
        let contract = ContractType::new("A");
        record.mark_deployed("a", &contract, ADDR, None, 0);
        assert_eq!(record.address_of("a"), Some(ADDR));

        record.mark_unit_failed("a", &contract, "reverted".into());
        assert_eq!(record.address_of("a"), None);
        assert_eq!(record.failures(), vec!["a".to_string()]);
        // a failure never moves the completion cursor
        assert_eq!(record.last_completed_step, Some(0));
    }

    #[test]
    fn step_retry_overwrites_in_place() {
        let mut record = DeploymentRecord::new("local");
        record.mark_step_failed(0, "a.setPeer".into(), "timeout".into());
        record.mark_applied(0, "a.setPeer".into(), None, 3);
        assert_eq!(record.steps.len(), 1);
        assert_eq!(record.step_status(0), StepStatus::Applied);
        assert!(record.steps[0].error.is_none());
        assert!(!record.has_failures());
    }

    #[test]
    fn file_store_round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let mut store = FileRecordStore::for_network(dir.path(), "bsc_testnet");
        assert!(store.load().unwrap().is_none());

        let mut record = DeploymentRecord::new("bsc_testnet");
        record.mark_deployed("vault_controller", &ContractType::new("VaultController"), ADDR, None, 0);
        store.save(&record).unwrap();

        assert!(dir.path().join(".chainplan/records/bsc_testnet.yaml").exists());
        assert_eq!(store.load().unwrap(), Some(record));
    }

    #[test]
    fn load_or_new_rejects_foreign_network() {
        let dir = TempDir::new().unwrap();
        let mut store = FileRecordStore::new(dir.path().join("r.yaml"));
        store.save(&DeploymentRecord::new("mainnet")).unwrap();

        let err = load_or_new(&store, "testnet").unwrap_err();
        assert!(err.to_string().contains("network 'mainnet'"), "{err}");
        assert_eq!(load_or_new(&store, "mainnet").unwrap().network, "mainnet");
    }

    #[test]
    fn memory_store_keeps_every_snapshot() {
        let mut store = MemoryRecordStore::new();
        let mut record = DeploymentRecord::new("local");
        store.save(&record).unwrap();
        record.mark_deployed("a", &ContractType::new("A"), ADDR, None, 0);
        store.save(&record).unwrap();
        assert_eq!(store.saves.len(), 2);
        assert_eq!(store.last().unwrap().address_of("a"), Some(ADDR));
    }
}
