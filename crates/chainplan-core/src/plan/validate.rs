//! Plan validation and execution ordering.

use super::{DeployableUnit, DeploymentPlan, WiringStep};
use crate::error::PlanError;
use crate::types::{Arg, MethodSig};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Check a plan before any external call is made.
///
/// Order of checks: duplicate names, unknown references, cycles, forward
/// references, then wiring method signatures. The first problem found is
/// returned.
///
/// A constructor argument may only name a unit declared earlier in the
/// plan, so declaration order is always a valid deploy order. Wiring runs
/// after every unit and may name any of them.
pub fn validate(plan: &DeploymentPlan) -> Result<(), PlanError> {
    let mut seen = HashSet::new();
    for unit in &plan.units {
        if !seen.insert(unit.name.as_str()) {
            return Err(PlanError::DuplicateUnit(unit.name.clone()));
        }
    }

    for unit in &plan.units {
        for reference in unit.references() {
            if !seen.contains(reference) {
                return Err(PlanError::UnknownReference {
                    context: format!("unit '{}'", unit.name),
                    reference: reference.to_string(),
                });
            }
        }
    }
    for (i, step) in plan.wiring.iter().enumerate() {
        for reference in step.references() {
            if !seen.contains(reference) {
                return Err(PlanError::UnknownReference {
                    context: step_context(i, step),
                    reference: reference.to_string(),
                });
            }
        }
    }

    execution_order(plan)?;

    let position: HashMap<&str, usize> = plan
        .units
        .iter()
        .enumerate()
        .map(|(i, u)| (u.name.as_str(), i))
        .collect();
    for (i, unit) in plan.units.iter().enumerate() {
        for reference in unit.references() {
            if position[reference] >= i {
                return Err(PlanError::UnknownReference {
                    context: format!("unit '{}'", unit.name),
                    reference: reference.to_string(),
                });
            }
        }
    }

    for (i, step) in plan.wiring.iter().enumerate() {
        check_method(i, step)?;
    }
    Ok(())
}

/// Units in the order they will be deployed.
///
/// Kahn's algorithm, breaking ties by declaration order, so a plan that
/// passes [`validate`] runs exactly as written. Cycles are reported here;
/// references to undeclared units are ignored and left to [`validate`].
pub fn execution_order(plan: &DeploymentPlan) -> Result<Vec<&DeployableUnit>, PlanError> {
    let index: HashMap<&str, usize> = plan
        .units
        .iter()
        .enumerate()
        .map(|(i, u)| (u.name.as_str(), i))
        .collect();

    // deps[i]: units that i needs; dependents[j]: units waiting on j
    let mut deps: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); plan.units.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); plan.units.len()];
    for (i, unit) in plan.units.iter().enumerate() {
        for reference in unit.references() {
            if let Some(&j) = index.get(reference) {
                if deps[i].insert(j) {
                    dependents[j].push(i);
                }
            }
        }
    }

    let mut in_degree: Vec<usize> = deps.iter().map(BTreeSet::len).collect();
    let mut ready: BTreeSet<usize> = (0..plan.units.len())
        .filter(|&i| in_degree[i] == 0)
        .collect();
    let mut order = Vec::with_capacity(plan.units.len());

    while let Some(i) = ready.pop_first() {
        order.push(&plan.units[i]);
        for &d in &dependents[i] {
            in_degree[d] -= 1;
            if in_degree[d] == 0 {
                ready.insert(d);
            }
        }
    }

    if order.len() < plan.units.len() {
        let emitted: HashSet<&str> = order.iter().map(|u| u.name.as_str()).collect();
        return Err(PlanError::Cycle(find_cycle(plan, &deps, &emitted)));
    }
    Ok(order)
}

/// Every unit left after Kahn's pass has an unresolved dependency on another
/// leftover unit, so following those edges must revisit a node.
fn find_cycle(plan: &DeploymentPlan, deps: &[BTreeSet<usize>], emitted: &HashSet<&str>) -> Vec<String> {
    let remaining = |i: usize| !emitted.contains(plan.units[i].name.as_str());
    let Some(start) = (0..plan.units.len()).find(|&i| remaining(i)) else {
        return Vec::new();
    };

    let mut path = vec![start];
    let mut current = start;
    loop {
        let Some(&next) = deps[current].iter().find(|&&j| remaining(j)) else {
            break;
        };
        if let Some(pos) = path.iter().position(|&p| p == next) {
            let mut cycle: Vec<String> = path[pos..]
                .iter()
                .map(|&i| plan.units[i].name.clone())
                .collect();
            cycle.push(plan.units[next].name.clone());
            return cycle;
        }
        path.push(next);
        current = next;
    }
    path.iter().map(|&i| plan.units[i].name.clone()).collect()
}

fn check_method(i: usize, step: &WiringStep) -> Result<(), PlanError> {
    let context = step_context(i, step);
    let (name, params) = MethodSig::parse(&step.method).map_err(|reason| PlanError::InvalidMethod {
        context: context.clone(),
        method: step.method.clone(),
        reason,
    })?;
    // bare names take their parameter types from the args, nothing to compare
    let Some(params) = params else {
        return Ok(());
    };

    if params.len() != step.args.len() {
        return Err(PlanError::ArityMismatch {
            context,
            method: name,
            expected: params.len(),
            actual: step.args.len(),
        });
    }

    for (position, (param, arg)) in params.iter().zip(&step.args).enumerate() {
        let ok = match arg {
            Arg::Ref(_) => *param == crate::types::ParamType::Address,
            Arg::Literal(token) => param.accepts(token),
        };
        if !ok {
            return Err(PlanError::TypeMismatch {
                context,
                method: name,
                position,
                expected: param.to_string(),
                actual: arg.param_type().to_string(),
            });
        }
    }
    Ok(())
}

fn step_context(i: usize, step: &WiringStep) -> String {
    format!("wiring step {i} ({})", step.label())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{DeployableUnit as Unit, WiringStep as Step};
    use alloy_primitives::U256;

    fn names(order: Vec<&Unit>) -> Vec<&str> {
        order.into_iter().map(|u| u.name.as_str()).collect()
    }

    fn linear_plan() -> DeploymentPlan {
        DeploymentPlan::new(
            vec![
                Unit::new("unit_a", "A", vec![Arg::uint(U256::from(42u64))]),
                Unit::new("unit_b", "B", vec![Arg::unit("unit_a")]),
            ],
            vec![Step::new("unit_b", "setPeer", vec![Arg::unit("unit_a")])],
        )
    }

    #[test]
    fn acyclic_plan_validates() {
        assert_eq!(validate(&linear_plan()), Ok(()));
    }

    #[test]
    fn empty_plan_validates() {
        assert_eq!(validate(&DeploymentPlan::default()), Ok(()));
    }

    #[test]
    fn reference_to_later_unit_is_rejected() {
        let plan = DeploymentPlan::new(
            vec![
                Unit::new("unit_b", "B", vec![Arg::unit("unit_a")]),
                Unit::new("unit_a", "A", vec![Arg::uint(U256::from(42u64))]),
            ],
            vec![],
        );
        assert_eq!(
            validate(&plan),
            Err(PlanError::UnknownReference {
                context: "unit 'unit_b'".into(),
                reference: "unit_a".into(),
            })
        );
    }

    #[test]
    fn wiring_may_reference_any_unit() {
        let plan = DeploymentPlan::new(
            vec![
                Unit::new("unit_a", "A", vec![]),
                Unit::new("unit_b", "B", vec![]),
            ],
            vec![Step::new("unit_a", "setPeer", vec![Arg::unit("unit_b")])],
        );
        assert_eq!(validate(&plan), Ok(()));
    }

    #[test]
    fn sorted_plan_keeps_declaration_order() {
        let plan = linear_plan();
        assert_eq!(
            names(execution_order(&plan).unwrap()),
            vec!["unit_a", "unit_b"]
        );
    }

    #[test]
    fn two_unit_cycle_is_rejected() {
        let plan = DeploymentPlan::new(
            vec![
                Unit::new("a", "A", vec![Arg::unit("b")]),
                Unit::new("b", "B", vec![Arg::unit("a")]),
            ],
            vec![],
        );
        assert_eq!(
            validate(&plan),
            Err(PlanError::Cycle(vec!["a".into(), "b".into(), "a".into()]))
        );
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let plan = DeploymentPlan::new(vec![Unit::new("a", "A", vec![Arg::unit("a")])], vec![]);
        assert_eq!(
            validate(&plan),
            Err(PlanError::Cycle(vec!["a".into(), "a".into()]))
        );
    }

    #[test]
    fn cycle_behind_a_healthy_prefix_is_found() {
        let plan = DeploymentPlan::new(
            vec![
                Unit::new("root", "R", vec![]),
                Unit::new("x", "X", vec![Arg::unit("root"), Arg::unit("z")]),
                Unit::new("y", "Y", vec![Arg::unit("x")]),
                Unit::new("z", "Z", vec![Arg::unit("y")]),
            ],
            vec![],
        );
        match validate(&plan) {
            Err(PlanError::Cycle(path)) => {
                assert_eq!(path.first(), path.last());
                assert_eq!(path.len(), 4, "{path:?}");
                assert!(!path.contains(&"root".to_string()));
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn unknown_unit_reference_is_rejected() {
        let plan = DeploymentPlan::new(vec![Unit::new("a", "A", vec![Arg::unit("ghost")])], vec![]);
        assert_eq!(
            validate(&plan),
            Err(PlanError::UnknownReference {
                context: "unit 'a'".into(),
                reference: "ghost".into(),
            })
        );
    }

    #[test]
    fn unknown_wiring_target_is_rejected() {
        let plan = DeploymentPlan::new(
            vec![Unit::new("a", "A", vec![])],
            vec![Step::new("ghost", "setPeer", vec![Arg::unit("a")])],
        );
        assert!(matches!(
            validate(&plan),
            Err(PlanError::UnknownReference { reference, .. }) if reference == "ghost"
        ));
    }

    #[test]
    fn unknown_wiring_argument_is_rejected() {
        let plan = DeploymentPlan::new(
            vec![Unit::new("a", "A", vec![])],
            vec![Step::new("a", "setPeer", vec![Arg::unit("ghost")])],
        );
        assert!(matches!(
            validate(&plan),
            Err(PlanError::UnknownReference { reference, .. }) if reference == "ghost"
        ));
    }

    #[test]
    fn duplicate_unit_is_rejected() {
        let plan = DeploymentPlan::new(
            vec![Unit::new("a", "A", vec![]), Unit::new("a", "A2", vec![])],
            vec![],
        );
        assert_eq!(validate(&plan), Err(PlanError::DuplicateUnit("a".into())));
    }

    #[test]
    fn explicit_signature_arity_is_checked() {
        let plan = DeploymentPlan::new(
            vec![Unit::new("a", "A", vec![])],
            vec![Step::new(
                "a",
                "approveToMaster(address,uint256)",
                vec![Arg::unit("a")],
            )],
        );
        assert!(matches!(
            validate(&plan),
            Err(PlanError::ArityMismatch { expected: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn explicit_signature_types_are_checked() {
        let plan = DeploymentPlan::new(
            vec![Unit::new("a", "A", vec![])],
            vec![Step::new("a", "setFee(uint8)", vec![Arg::uint(U256::from(300u64))])],
        );
        match validate(&plan) {
            Err(PlanError::TypeMismatch {
                position, expected, ..
            }) => {
                assert_eq!(position, 0);
                assert_eq!(expected, "uint8");
            }
            other => panic!("expected type mismatch, got {other:?}"),
        }

        let plan = DeploymentPlan::new(
            vec![Unit::new("a", "A", vec![])],
            vec![Step::new("a", "setFee(uint256)", vec![Arg::unit("a")])],
        );
        assert!(matches!(validate(&plan), Err(PlanError::TypeMismatch { .. })));
    }

    #[test]
    fn malformed_signature_is_rejected() {
        let plan = DeploymentPlan::new(
            vec![Unit::new("a", "A", vec![])],
            vec![Step::new("a", "setName(string)", vec![])],
        );
        assert!(matches!(validate(&plan), Err(PlanError::InvalidMethod { .. })));
    }
}
