//! On-disk plan format.
//!
//! ```yaml
//! units:
//!   - name: vault_controller
//!     contract: VaultController
//!   - name: vault_strategy
//!     contract: VaultStrategy
//!     args:
//!       - ref: vault_controller
//! wiring:
//!   - target: vault_controller
//!     method: approveToManager(address,uint256)
//!     args:
//!       - address: "0xae13d989daC2f0dEbFf460aC112a837C89BAa7cd"
//!       - uint: max
//! ```

use super::{DeployableUnit, DeploymentPlan, WiringStep};
use crate::error::PlanError;
use crate::types::{Arg, Token};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanFile {
    #[serde(default)]
    pub units: Vec<UnitDecl>,
    #[serde(default)]
    pub wiring: Vec<StepDecl>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitDecl {
    pub name: String,
    pub contract: String,
    #[serde(default)]
    pub args: Vec<ArgDecl>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDecl {
    pub target: String,
    pub method: String,
    #[serde(default)]
    pub args: Vec<ArgDecl>,
}

/// Literals stay as raw YAML scalars until conversion so that unquoted
/// numbers and quoted strings are accepted alike.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgDecl {
    Ref(String),
    Address(Value),
    Uint(Value),
    Bool(Value),
    Bytes32(Value),
}

impl ArgDecl {
    fn into_arg(self, context: &str) -> Result<Arg, PlanError> {
        let (kind, value) = match self {
            Self::Ref(name) => return Ok(Arg::Ref(name)),
            Self::Address(v) => ("address", v),
            Self::Uint(v) => ("uint", v),
            Self::Bool(v) => ("bool", v),
            Self::Bytes32(v) => ("bytes32", v),
        };
        let raw = scalar_text(&value).ok_or_else(|| PlanError::InvalidLiteral {
            context: context.to_string(),
            reason: format!("{kind} literal must be a scalar"),
        })?;
        Token::parse(kind, &raw)
            .map(Arg::Literal)
            .map_err(|reason| PlanError::InvalidLiteral {
                context: context.to_string(),
                reason,
            })
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl PlanFile {
    /// Convert to the domain model. Only literal syntax is checked here;
    /// graph-level checks belong to [`super::validate`].
    pub fn into_plan(self) -> Result<DeploymentPlan, PlanError> {
        let units = self
            .units
            .into_iter()
            .map(|u| {
                let context = format!("unit '{}'", u.name);
                let args = u
                    .args
                    .into_iter()
                    .map(|a| a.into_arg(&context))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(DeployableUnit::new(u.name, u.contract, args))
            })
            .collect::<Result<Vec<_>, PlanError>>()?;

        let wiring = self
            .wiring
            .into_iter()
            .enumerate()
            .map(|(i, s)| {
                let context = format!("wiring step {i} ({}.{})", s.target, s.method);
                let args = s
                    .args
                    .into_iter()
                    .map(|a| a.into_arg(&context))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(WiringStep::new(s.target, s.method, args))
            })
            .collect::<Result<Vec<_>, PlanError>>()?;

        Ok(DeploymentPlan::new(units, wiring))
    }
}
