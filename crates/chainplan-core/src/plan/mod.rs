//! Deployment plan data model.
//!
//! A plan is an ordered list of deployable units followed by an ordered list
//! of wiring steps. Argument references between units form a DAG; wiring
//! steps hang off that DAG and always run after every unit is deployed.

pub mod file;
pub mod validate;

pub use file::PlanFile;
pub use validate::{execution_order, validate};

use crate::error::{PlanError, Result};
use crate::types::{Arg, ContractType};
use std::path::Path;

// ---------------------------------------------------------------------------
// DeployableUnit
// ---------------------------------------------------------------------------

/// One contract instance to deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployableUnit {
    pub name: String,
    pub contract: ContractType,
    pub args: Vec<Arg>,
}

impl DeployableUnit {
    pub fn new(name: impl Into<String>, contract: impl Into<String>, args: Vec<Arg>) -> Self {
        Self {
            name: name.into(),
            contract: ContractType::new(contract),
            args,
        }
    }

    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.args.iter().filter_map(Arg::reference)
    }
}

// ---------------------------------------------------------------------------
// WiringStep
// ---------------------------------------------------------------------------

/// A post-deployment call on `target`. Either a full signature such as
/// `setManager(address)` or a bare method name whose parameter types are
/// inferred from `args`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WiringStep {
    pub target: String,
    pub method: String,
    pub args: Vec<Arg>,
}

impl WiringStep {
    pub fn new(target: impl Into<String>, method: impl Into<String>, args: Vec<Arg>) -> Self {
        Self {
            target: target.into(),
            method: method.into(),
            args,
        }
    }

    /// Stable identity stored in the record, e.g. `vault_controller.setManager(address)`.
    pub fn label(&self) -> String {
        format!("{}.{}", self.target, self.method.trim())
    }

    /// Every unit this step needs deployed: the target and any referenced args.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.target.as_str()).chain(self.args.iter().filter_map(Arg::reference))
    }
}

// ---------------------------------------------------------------------------
// DeploymentPlan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentPlan {
    pub units: Vec<DeployableUnit>,
    pub wiring: Vec<WiringStep>,
}

impl DeploymentPlan {
    pub fn new(units: Vec<DeployableUnit>, wiring: Vec<WiringStep>) -> Self {
        Self { units, wiring }
    }

    /// Load a YAML plan file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(crate::error::ChainplanError::PlanNotFound(
                path.display().to_string(),
            ));
        }
        let data = std::fs::read_to_string(path)?;
        Self::from_yaml(&data)
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        let file: PlanFile = serde_yaml::from_str(data)?;
        Ok(file.into_plan()?)
    }

    pub fn unit(&self, name: &str) -> Option<&DeployableUnit> {
        self.units.iter().find(|u| u.name == name)
    }

    pub fn validate(&self) -> std::result::Result<(), PlanError> {
        validate(self)
    }

    /// Total number of external calls a fresh run would make.
    pub fn step_count(&self) -> usize {
        self.units.len() + self.wiring.len()
    }
}
