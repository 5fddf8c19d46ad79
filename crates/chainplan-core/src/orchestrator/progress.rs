//! Read-only view of how far a record has got through a plan.

use crate::error::PlanError;
use crate::plan::{execution_order, DeploymentPlan};
use crate::record::DeploymentRecord;
use alloy_primitives::{Address, B256};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Unit,
    Wiring,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressItem {
    pub position: usize,
    pub kind: ItemKind,
    pub label: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<B256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One item per unit (in execution order) and per wiring step, in the order
/// a run would visit them.
pub fn progress(
    plan: &DeploymentPlan,
    record: &DeploymentRecord,
) -> Result<Vec<ProgressItem>, PlanError> {
    let order = execution_order(plan)?;
    let mut items = Vec::with_capacity(plan.step_count());

    for unit in order {
        let entry = record.units.get(&unit.name);
        items.push(ProgressItem {
            position: items.len(),
            kind: ItemKind::Unit,
            label: format!("{} ({})", unit.name, unit.contract),
            status: record.unit_status(&unit.name).to_string(),
            address: entry.and_then(|e| e.address),
            tx_hash: entry.and_then(|e| e.tx_hash),
            error: entry.and_then(|e| e.error.clone()),
        });
    }

    for (index, step) in plan.wiring.iter().enumerate() {
        let entry = record.steps.get(index);
        items.push(ProgressItem {
            position: items.len(),
            kind: ItemKind::Wiring,
            label: step.label(),
            status: record.step_status(index).to_string(),
            address: None,
            tx_hash: entry.and_then(|e| e.tx_hash),
            error: entry.and_then(|e| e.error.clone()),
        });
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{DeployableUnit, WiringStep};
    use crate::types::{Arg, ContractType};

    #[test]
    fn progress_lists_units_then_wiring() {
        let plan = DeploymentPlan::new(
            vec![
                DeployableUnit::new("controller", "VaultController", vec![]),
                DeployableUnit::new("strategy", "VaultStrategy", vec![Arg::unit("controller")]),
            ],
            vec![WiringStep::new(
                "controller",
                "setStrategy(address)",
                vec![Arg::unit("strategy")],
            )],
        );
        let mut record = DeploymentRecord::new("local");
        record.mark_deployed(
            "controller",
            &ContractType::new("VaultController"),
            Address::repeat_byte(0x11),
            None,
            0,
        );

        let items = progress(&plan, &record).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].label, "controller (VaultController)");
        assert_eq!(items[0].status, "deployed");
        assert_eq!(items[0].address, Some(Address::repeat_byte(0x11)));
        assert_eq!(items[1].label, "strategy (VaultStrategy)");
        assert_eq!(items[1].status, "pending");
        assert_eq!(items[2].kind, ItemKind::Wiring);
        assert_eq!(items[2].position, 2);
        assert_eq!(items[2].status, "pending");
    }
}
