use crate::output::{print_json, print_table};
use anyhow::Context;
use chainplan_core::{config::Config, plan::execution_order, ChainplanError};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct ValidateOutput<'a> {
    plan: String,
    valid: bool,
    order: Vec<&'a str>,
    wiring: Vec<String>,
}

pub fn run(root: &Path, plan: Option<&Path>, json: bool) -> anyhow::Result<()> {
    // validating a plan does not need networks, so an uninitialised root is fine
    let config = match Config::load(root) {
        Ok(cfg) => cfg,
        Err(ChainplanError::NotInitialized) => Config::new("project"),
        Err(e) => return Err(e).context("failed to load config.yaml"),
    };

    let (path, plan) = super::load_plan(root, &config, plan)?;
    plan.validate()
        .with_context(|| format!("{} is invalid", path.display()))?;
    let order = execution_order(&plan)?;

    if json {
        return print_json(&ValidateOutput {
            plan: path.display().to_string(),
            valid: true,
            order: order.iter().map(|u| u.name.as_str()).collect(),
            wiring: plan.wiring.iter().map(|s| s.label()).collect(),
        });
    }

    println!(
        "{}: ok ({} units, {} wiring steps)",
        path.display(),
        plan.units.len(),
        plan.wiring.len()
    );
    let rows: Vec<Vec<String>> = order
        .iter()
        .enumerate()
        .map(|(i, unit)| {
            let deps: Vec<&str> = unit.references().collect();
            vec![
                i.to_string(),
                unit.name.clone(),
                unit.contract.to_string(),
                deps.join(", "),
            ]
        })
        .collect();
    if !rows.is_empty() {
        println!();
        print_table(&["#", "UNIT", "CONTRACT", "DEPENDS ON"], &rows);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chainplan_core::{plan::execution_order, DeploymentPlan};

    #[test]
    fn vault_router_demo_is_valid() {
        let plan =
            DeploymentPlan::from_yaml(include_str!("../../../../demos/vault-router.yaml")).unwrap();
        plan.validate().unwrap();

        let order: Vec<&str> = execution_order(&plan)
            .unwrap()
            .iter()
            .map(|u| u.name.as_str())
            .collect();
        assert_eq!(order, ["vault_manager", "vault_controller", "vault_strategy"]);
        assert_eq!(plan.wiring.len(), 7);
        assert_eq!(plan.step_count(), 10);
    }
}
